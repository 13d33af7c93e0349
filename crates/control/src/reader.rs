use crate::Paragraph;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::BufRead;

enum Line {
    /// Blank (or whitespace-only) line: paragraph separator.
    Blank,
    /// `#` comment, ignored.
    Comment,
    /// Starts with whitespace: continues the previous field.
    Continuation(String),
    /// `Name: value`
    Field(String, String),
    /// Anything else.
    Malformed,
}

impl Line {
    fn classify(raw: &[u8]) -> Self {
        // Indexes are UTF-8 in practice, but very old snapshots contain the
        // odd Latin-1 maintainer name. Don't let that kill the whole stream.
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches(['\n', '\r']);
        if text.trim().is_empty() {
            return Self::Blank;
        }
        if text.starts_with('#') {
            return Self::Comment;
        }
        if text.starts_with([' ', '\t']) {
            return Self::Continuation(text.trim().to_string());
        }
        match memchr::memchr(b':', text.as_bytes()) {
            Some(0) | None => Self::Malformed,
            Some(colon) => Self::Field(text[..colon].trim().to_string(), text[colon + 1..].trim().to_string()),
        }
    }
}

/// Streaming iterator over the paragraphs of a control document.
///
/// Yields `Err` with [`ErrorKind::Syntax`] for a paragraph containing a line
/// that is neither a field nor a continuation, then carries on with the next
/// paragraph. A [`ErrorKind::Read`] error ends the iteration.
///
/// # Examples
///
/// ```
/// use debsnap_control::Paragraphs;
///
/// let document = b"Package: zlib\nVersion: 1:1.2.11\n\nPackage: bash\nVersion: 4.4-5\n";
/// let packages: Vec<String> = Paragraphs::new(&document[..])
///     .map(|paragraph| paragraph.unwrap().get("package").unwrap().to_string())
///     .collect();
/// assert_eq!(packages, ["zlib", "bash"]);
/// ```
pub struct Paragraphs<R> {
    reader: R,
    buffer: Vec<u8>,
    line: usize,
    finished: bool,
}

impl<R: BufRead> Paragraphs<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line: 0,
            finished: false,
        }
    }

    /// Read the next raw line into the buffer; `Ok(false)` at end of input.
    fn read_line(&mut self) -> Result<bool> {
        self.buffer.clear();
        let read = self.reader.read_until(b'\n', &mut self.buffer).or_raise(|| ErrorKind::Read)?;
        self.line += 1;
        Ok(read > 0)
    }

    fn next_paragraph(&mut self) -> Result<Option<Paragraph>> {
        let mut paragraph = Paragraph::default();
        let mut start = None;
        let mut malformed = false;
        while self.read_line()? {
            match Line::classify(&self.buffer) {
                Line::Blank if start.is_none() => continue,
                Line::Blank => break,
                Line::Comment => continue,
                Line::Continuation(text) => {
                    start.get_or_insert(self.line);
                    malformed |= !paragraph.continue_last(&text);
                },
                Line::Field(name, value) => {
                    start.get_or_insert(self.line);
                    paragraph.push(name, value);
                },
                Line::Malformed => {
                    start.get_or_insert(self.line);
                    malformed = true;
                },
            }
        }
        match start {
            None => Ok(None),
            Some(line) if malformed => {
                tracing::trace!(line, "Skipping malformed paragraph");
                exn::bail!(ErrorKind::Syntax { line })
            },
            Some(_) => Ok(Some(paragraph)),
        }
    }
}

impl<R: BufRead> Iterator for Paragraphs<R> {
    type Item = Result<Paragraph>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_paragraph() {
            Ok(Some(paragraph)) => Some(Ok(paragraph)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(err) => {
                if matches!(*err, ErrorKind::Read) {
                    self.finished = true;
                }
                Some(Err(err))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{BufReader, Read};

    const SOURCES: &str = "\
Package: zlib
Binary: zlib1g, zlib1g-dev
Version: 1:1.2.11.dfsg-1
Checksums-Sha256:
 0aa8d0b8aef3c10ee8c67c0bd32e5b0c1bba7c8c5bb9c7b5f0c2bd7c9e9c9f10 2236 zlib_1.2.11.dfsg-1.dsc
 1bb8d0b8aef3c10ee8c67c0bd32e5b0c1bba7c8c5bb9c7b5f0c2bd7c9e9c9f11 370248 zlib_1.2.11.dfsg.orig.tar.gz

# comment between paragraphs


Package: bash
Version: 4.4-5
";

    fn collect(document: &str) -> Vec<Result<Paragraph>> {
        Paragraphs::new(document.as_bytes()).collect()
    }

    #[test]
    fn parses_multiline_fields() {
        let paragraphs = collect(SOURCES);
        assert_eq!(paragraphs.len(), 2);
        let zlib = paragraphs[0].as_ref().unwrap();
        assert_eq!(zlib.get("package"), Some("zlib"));
        assert_eq!(zlib.get("version"), Some("1:1.2.11.dfsg-1"));
        let checksums = zlib.get("checksums-sha256").unwrap();
        let lines: Vec<&str> = checksums.lines().filter(|line| !line.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("zlib_1.2.11.dfsg.orig.tar.gz"));
        assert_eq!(paragraphs[1].as_ref().unwrap().get("Package"), Some("bash"));
    }

    #[test]
    fn preserves_field_order_and_spelling() {
        let paragraphs = collect("Package: a\nSHA256: ff\n");
        let names: Vec<&str> = paragraphs[0].as_ref().unwrap().fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["Package", "SHA256"]);
    }

    #[rstest]
    #[case("")]
    #[case("\n\n   \n")]
    #[case("# only a comment\n")]
    fn empty_documents(#[case] document: &str) {
        assert!(collect(document).is_empty());
    }

    #[test]
    fn malformed_paragraph_is_skipped() {
        let paragraphs = collect("Package: a\nthis is not a field\n\nPackage: b\n");
        assert_eq!(paragraphs.len(), 2);
        let err = paragraphs[0].as_ref().unwrap_err();
        assert_eq!(**err, ErrorKind::Syntax { line: 1 });
        assert_eq!(paragraphs[1].as_ref().unwrap().get("package"), Some("b"));
    }

    #[test]
    fn leading_continuation_is_malformed() {
        let paragraphs = collect(" orphan\nPackage: a\n");
        assert!(paragraphs[0].is_err());
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let document = b"Package: a\nMaintainer: Jos\xe9\n";
        let paragraphs: Vec<_> = Paragraphs::new(&document[..]).collect();
        assert_eq!(paragraphs[0].as_ref().unwrap().get("package"), Some("a"));
    }

    struct Failing;
    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt xz block"))
        }
    }

    #[test]
    fn read_errors_end_iteration() {
        let mut paragraphs = Paragraphs::new(BufReader::new(Failing));
        let err = paragraphs.next().unwrap().unwrap_err();
        assert_eq!(*err, ErrorKind::Read);
        assert!(paragraphs.next().is_none());
    }
}

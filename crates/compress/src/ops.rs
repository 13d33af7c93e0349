use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use exn::ResultExt;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::{read::XzDecoder, write::XzEncoder};

/// Encoders whose trailer is only written by consuming them.
trait Finish: Write {
    fn close(self: Box<Self>) -> io::Result<()>;
}

impl<W: Write> Finish for BzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}

impl<W: Write> Finish for GzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}

#[cfg(feature = "xz")]
impl<W: Write> Finish for XzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}

impl Compression {
    /// Pack `input` in this format.
    ///
    /// The archive decides how real indexes are packed, so this only serves
    /// to build fixtures.
    ///
    /// ```
    /// use debsnap_compress::Compression;
    ///
    /// let packed = Compression::Gzip.compress(b"Package: zlib\n").unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&packed), Compression::Gzip);
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut encoder: Box<dyn Finish + '_> = match self {
            Compression::None => {
                output.extend_from_slice(input);
                return Ok(output);
            },
            Compression::Bzip2 => Box::new(BzEncoder::new(&mut output, bzip2::Compression::default())),
            Compression::Gzip => Box::new(GzEncoder::new(&mut output, flate2::Compression::default())),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzEncoder::new(&mut output, 6)),
        };
        encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
        encoder.close().or_raise(|| ErrorKind::Io)?;
        Ok(output)
    }

    /// Put a lazy decoder in front of `reader`.
    ///
    /// Nothing is decoded until the result is read from, and corruption
    /// surfaces as an [`io::Error`] from `read` at the point it is reached.
    ///
    /// ```
    /// use std::io::Read;
    /// use debsnap_compress::Compression;
    ///
    /// let packed = Compression::Bzip2.compress(b"Package: zlib\n").unwrap();
    /// let mut text = String::new();
    /// Compression::Bzip2.wrap_reader(&packed[..]).read_to_string(&mut text).unwrap();
    /// assert_eq!(text, "Package: zlib\n");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new(reader)),
        }
    }

    /// Decode the whole of `reader`, discarding the output, and return the
    /// decoded size.
    ///
    /// Truncated streams, bad checksums and garbage headers all fail with
    /// [`InvalidData`](ErrorKind::InvalidData).
    #[instrument(skip(reader), fields(format = %self, output_size))]
    pub fn verify<R: Read>(&self, reader: R) -> Result<u64> {
        let size = io::copy(&mut self.wrap_reader(reader), &mut io::sink()).or_raise(|| ErrorKind::InvalidData)?;
        tracing::Span::current().record("output_size", size);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use rstest::rstest;
    use std::io::Read;

    const STANZA: &[u8] = b"Package: zlib\nVersion: 1:1.2.11.dfsg-1\nSHA256: 00ff\n\n";

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    fn packed_fixtures_decode(#[case] format: Compression) {
        let packed = format.compress(STANZA).unwrap();
        assert_eq!(Compression::from_magic_bytes(&packed), format);
        let mut decoded = Vec::new();
        format.wrap_reader(&packed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, STANZA);
        assert_eq!(format.verify(&packed[..]).unwrap(), STANZA.len() as u64);
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    fn garbage_is_invalid(#[case] format: Compression) {
        let err = format.verify(&b"<html>503 Service Unavailable</html>"[..]).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData);
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    fn truncated_is_invalid(#[case] format: Compression) {
        let packed = format.compress(&STANZA.repeat(64)).unwrap();
        let err = format.verify(&packed[..packed.len() / 2]).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData);
    }
}

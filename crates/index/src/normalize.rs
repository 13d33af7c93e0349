//! Stanza Normalizer: parsed paragraphs to typed records.

use crate::error::{ErrorKind, Result};
use crate::models::{BinaryRecord, SourceRecord};
use debsnap_cache::IndexKind;
use debsnap_config::{ChecksumRule, FieldsConfig};
use debsnap_control::Paragraph;
use exn::ResultExt;
use regex::Regex;
use std::collections::BTreeSet;

/// What became of one stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized<T> {
    Record(T),
    /// The package is not on the allow-list.
    Filtered,
    /// Package, version or checksum could not be resolved.
    Malformed,
}

impl<T> Normalized<T> {
    pub fn record(self) -> Option<T> {
        match self {
            Self::Record(record) => Some(record),
            Self::Filtered | Self::Malformed => None,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        match self {
            Self::Record(record) => Normalized::Record(f(record)),
            Self::Filtered => Normalized::Filtered,
            Self::Malformed => Normalized::Malformed,
        }
    }
}

/// A record of either role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Source(SourceRecord),
    Binary(BinaryRecord),
}

#[derive(Debug)]
struct Rule {
    field: String,
    pattern: Regex,
}

impl Rule {
    fn compile(rule: &ChecksumRule) -> Result<Self> {
        let invalid = || ErrorKind::InvalidPattern {
            field: rule.field.clone(),
            pattern: rule.pattern.clone(),
        };
        let pattern = Regex::new(&rule.pattern).or_raise(invalid)?;
        // Group 0 is the whole match.
        if pattern.captures_len() != 2 {
            exn::bail!(invalid());
        }
        Ok(Self {
            field: rule.field.trim().to_lowercase(),
            pattern,
        })
    }

    /// Digest from the last matching line of the field, if any.
    fn extract(&self, stanza: &Paragraph) -> Option<String> {
        stanza
            .get(&self.field)?
            .lines()
            .map(str::trim)
            .filter_map(|line| self.pattern.captures(line))
            .filter_map(|captures| captures.get(1))
            .map(|digest| digest.as_str().to_string())
            .last()
    }
}

/// Turns index stanzas into [`SourceRecord`]s and [`BinaryRecord`]s.
///
/// Built once from the checksum rules and the package allow-list, then
/// shared read-only by every worker. Rules are tried in configuration order
/// and the first one that yields a digest wins, which covers index formats
/// that changed their checksum fields over the years.
#[derive(Debug)]
pub struct Normalizer {
    source: Vec<Rule>,
    binary: Vec<Rule>,
    packages: BTreeSet<String>,
}

impl Normalizer {
    /// An empty `packages` list allows every package.
    pub fn new<P: Into<String>>(fields: &FieldsConfig, packages: impl IntoIterator<Item = P>) -> Result<Self> {
        Ok(Self {
            source: fields.source.iter().map(Rule::compile).collect::<Result<_>>()?,
            binary: fields.binary.iter().map(Rule::compile).collect::<Result<_>>()?,
            packages: packages
                .into_iter()
                .map(Into::into)
                .map(|package: String| package.trim().to_string())
                .filter(|package| !package.is_empty())
                .collect(),
        })
    }

    /// The configured allow-list (empty when every package is allowed).
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub fn allows(&self, package: &str) -> bool {
        self.packages.is_empty() || self.packages.contains(package)
    }

    pub fn normalize(&self, stanza: &Paragraph, role: IndexKind) -> Normalized<Record> {
        match role {
            IndexKind::Source => self.source(stanza).map(Record::Source),
            IndexKind::Binary => self.binary(stanza).map(Record::Binary),
        }
    }

    pub fn source(&self, stanza: &Paragraph) -> Normalized<SourceRecord> {
        self.resolve(stanza, &self.source).map(|(package, version, hash_source)| SourceRecord {
            package,
            version,
            hash_source,
        })
    }

    pub fn binary(&self, stanza: &Paragraph) -> Normalized<BinaryRecord> {
        self.resolve(stanza, &self.binary).map(|(package, version, hash_binary)| BinaryRecord {
            package,
            version,
            hash_binary,
        })
    }

    fn resolve(&self, stanza: &Paragraph, rules: &[Rule]) -> Normalized<(String, String, String)> {
        let Some(package) = required(stanza, "package") else {
            return Normalized::Malformed;
        };
        if !self.allows(&package) {
            return Normalized::Filtered;
        }
        let Some(version) = required(stanza, "version") else {
            return Normalized::Malformed;
        };
        match rules.iter().find_map(|rule| rule.extract(stanza)) {
            Some(digest) => Normalized::Record((package, version, digest)),
            None => {
                tracing::trace!(%package, %version, "No checksum found in stanza");
                Normalized::Malformed
            },
        }
    }
}

fn required(stanza: &Paragraph, field: &str) -> Option<String> {
    stanza.get(field).map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SOURCE_HEX: &str = "5fb3b1e4ee1b8f6ef3e8f7b0d3c1b1a2c3d4e5f60718293a4b5c6d7e8f901234";
    const DSC_HEX: &str = "0000000000000000000000000000000000000000000000000000000000000000";
    const BINARY_HEX: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

    fn stanza(fields: &[(&str, &str)]) -> Paragraph {
        fields.iter().copied().collect()
    }

    fn zlib_source() -> Paragraph {
        let checksums = format!(
            "\n{DSC_HEX} 2236 zlib_1.2.11.dsc\n{SOURCE_HEX} 370248 zlib_1.2.11.orig.tar.gz\n{DSC_HEX} 9000 zlib_1.2.11-1.debian.tar.xz"
        );
        stanza(&[("Package", "zlib"), ("Version", "1:1.2.11"), ("Checksums-Sha256", checksums.as_str())])
    }

    fn normalizer(packages: &[&str]) -> Normalizer {
        Normalizer::new(&FieldsConfig::default(), packages.iter().copied()).unwrap()
    }

    #[test]
    fn source_takes_orig_tarball_digest() {
        let record = normalizer(&[]).source(&zlib_source()).record().unwrap();
        assert_eq!(
            record,
            SourceRecord {
                package: "zlib".into(),
                version: "1:1.2.11".into(),
                hash_source: SOURCE_HEX.into(),
            }
        );
    }

    #[test]
    fn binary_takes_single_value_digest() {
        let paragraph = stanza(&[("Package", " zlib "), ("Version", "1:1.2.11"), ("SHA256", BINARY_HEX)]);
        let record = normalizer(&[]).normalize(&paragraph, IndexKind::Binary).record().unwrap();
        assert_eq!(
            record,
            Record::Binary(BinaryRecord {
                package: "zlib".into(),
                version: "1:1.2.11".into(),
                hash_binary: BINARY_HEX.into(),
            })
        );
    }

    #[rstest]
    #[case(&[("Version", "1.0"), ("SHA256", BINARY_HEX)])]
    #[case(&[("Package", "a"), ("SHA256", BINARY_HEX)])]
    #[case(&[("Package", "a"), ("Version", ""), ("SHA256", BINARY_HEX)])]
    #[case(&[("Package", "a"), ("Version", "1.0")])]
    #[case(&[("Package", "a"), ("Version", "1.0"), ("SHA256", "not-hex")])]
    fn unresolvable_stanzas_are_malformed(#[case] fields: &[(&str, &str)]) {
        assert_eq!(normalizer(&[]).binary(&stanza(fields)), Normalized::Malformed);
    }

    #[test]
    fn source_without_orig_tarball_is_malformed() {
        let checksums = format!("\n{DSC_HEX} 2236 native_1.0.dsc\n{DSC_HEX} 9000 native_1.0.tar.xz");
        let paragraph = stanza(&[("Package", "native"), ("Version", "1.0"), ("Checksums-Sha256", checksums.as_str())]);
        assert_eq!(normalizer(&[]).source(&paragraph), Normalized::Malformed);
    }

    #[test]
    fn detached_signature_is_not_the_tarball() {
        let signature = "2".repeat(64);
        let checksums = format!(
            "\n{DSC_HEX} 2236 zlib_1.2.11.dsc\n{SOURCE_HEX} 370248 zlib_1.2.11.orig.tar.gz\n{signature} 488 zlib_1.2.11.orig.tar.gz.asc"
        );
        let paragraph = stanza(&[("Package", "zlib"), ("Version", "1:1.2.11"), ("Checksums-Sha256", checksums.as_str())]);
        assert_eq!(normalizer(&[]).source(&paragraph).record().unwrap().hash_source, SOURCE_HEX);
    }

    #[rstest]
    #[case("zlib_1.2.11.orig.tar.gz", true)]
    #[case("zlib_1.2.11.orig.tar.bz2", true)]
    #[case("zlib_1.2.11.orig.tar.xz", true)]
    #[case("zlib_1.2.11.orig.tar.gz.asc", false)]
    #[case("zlib_1.2.11.orig.tar", false)]
    #[case("zlib_1.2.11.debian.tar.xz", false)]
    fn orig_tarball_names(#[case] filename: &str, #[case] taken: bool) {
        let checksums = format!("\n{SOURCE_HEX} 370248 {filename}");
        let paragraph = stanza(&[("Package", "zlib"), ("Version", "1:1.2.11"), ("Checksums-Sha256", checksums.as_str())]);
        assert_eq!(normalizer(&[]).source(&paragraph) != Normalized::Malformed, taken);
    }

    #[test]
    fn legacy_sources_fall_back_to_md5_files() {
        let md5 = "0123456789abcdef0123456789abcdef";
        let files = format!("\nffffffffffffffffffffffffffffffff 1200 bash_3.0-15.dsc\n{md5} 2418293 bash_3.0.orig.tar.gz");
        let paragraph = stanza(&[("Package", "bash"), ("Version", "3.0-15"), ("Files", files.as_str())]);
        assert_eq!(normalizer(&[]).source(&paragraph).record().unwrap().hash_source, md5);
    }

    #[test]
    fn sha256_is_preferred_over_md5() {
        let source = zlib_source();
        let paragraph: Paragraph = source
            .fields()
            .chain([("Files", "\n0123456789abcdef0123456789abcdef 370248 zlib_1.2.11.orig.tar.gz")])
            .collect();
        assert_eq!(normalizer(&[]).source(&paragraph).record().unwrap().hash_source, SOURCE_HEX);
    }

    #[test]
    fn legacy_binaries_fall_back_to_md5sum() {
        let md5 = "0123456789abcdef0123456789abcdef";
        let paragraph = stanza(&[("Package", "bash"), ("Version", "3.0-15"), ("MD5sum", md5)]);
        assert_eq!(normalizer(&[]).binary(&paragraph).record().unwrap().hash_binary, md5);
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&["zlib"], true)]
    #[case(&["bash", " zlib "], true)]
    #[case(&["bash"], false)]
    fn allow_list(#[case] packages: &[&str], #[case] allowed: bool) {
        let normalized = normalizer(packages).source(&zlib_source());
        assert_eq!(normalized != Normalized::Filtered, allowed);
    }

    #[test]
    fn blank_allow_list_entries_are_ignored() {
        assert!(normalizer(&["", "  "]).packages().is_empty());
    }

    #[test]
    fn rules_are_tried_in_order() {
        let fields = FieldsConfig {
            binary: vec![
                ChecksumRule::new("sha256", "^([0-9a-f]{64})$"),
                ChecksumRule::new("md5sum", "^([0-9a-f]{32})$"),
            ],
            ..FieldsConfig::default()
        };
        let normalizer = Normalizer::new(&fields, Vec::<String>::new()).unwrap();
        let legacy = stanza(&[("Package", "a"), ("Version", "1"), ("MD5sum", "0123456789abcdef0123456789abcdef")]);
        assert_eq!(normalizer.binary(&legacy).record().unwrap().hash_binary, "0123456789abcdef0123456789abcdef");
    }

    #[rstest]
    #[case("([0-9a-f]{64}")]
    #[case("^[0-9a-f]{64}$")]
    #[case("^([0-9a-f]{64}) (\\S+)$")]
    fn invalid_patterns(#[case] pattern: &str) {
        let fields = FieldsConfig {
            source: vec![ChecksumRule::new("checksums-sha256", pattern)],
            ..FieldsConfig::default()
        };
        let err = Normalizer::new(&fields, Vec::<String>::new()).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidPattern { .. }));
    }
}

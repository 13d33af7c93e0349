use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

/// Leading bytes of each compressed format, checked in order.
const SIGNATURES: &[(&[u8], Compression)] = &[
    (b"BZh".as_slice(), Compression::Bzip2),
    (b"\x1F\x8B".as_slice(), Compression::Gzip),
    #[cfg(feature = "xz")]
    (b"\xFD7zXZ\x00".as_slice(), Compression::Xz),
];

/// Number of leading bytes needed to recognize any supported format.
pub const MAGIC_BYTES_LEN: usize = 6;

impl Compression {
    /// The format an index file name declares through its extension.
    ///
    /// Names without a recognized extension (`Packages`, `Release.gpg`) are
    /// treated as uncompressed; callers that care can confirm with
    /// [`from_magic_bytes`](Self::from_magic_bytes).
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let Some(extension) = path.as_ref().extension().and_then(|ext| ext.to_str()) else {
            return Compression::None;
        };
        match extension.to_ascii_lowercase().as_str() {
            "bz2" => Compression::Bzip2,
            "gz" => Compression::Gzip,
            #[cfg(feature = "xz")]
            "xz" | "lzma" => Compression::Xz,
            _ => Compression::None,
        }
    }

    /// The format whose signature `head` starts with, or
    /// [`None`](Self::None) if nothing matches.
    #[must_use]
    pub fn from_magic_bytes(head: &[u8]) -> Self {
        SIGNATURES
            .iter()
            .find(|(signature, _)| head.starts_with(signature))
            .map_or(Compression::None, |(_, format)| *format)
    }

    /// Short lowercase name, used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
            #[cfg(feature = "xz")]
            Compression::Xz => "xz",
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

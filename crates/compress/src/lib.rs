//! Codecs for archive index files.
//!
//! The snapshot archive has packed its indexes differently over the years
//! (`Sources.gz`, `Sources.bz2`, `Sources.xz`). [`Compression`] names the
//! format, which is read off the file name ([`Compression::from_path`]) or
//! sniffed from the first bytes ([`Compression::from_magic_bytes`]), and
//! decodes lazily through [`Compression::wrap_reader`] so an index is never
//! held in memory whole. [`Compression::verify`] decodes a file end to end
//! to catch truncated or corrupt downloads.
//!
//! XZ support sits behind the default `xz` feature.

mod detect;
pub mod error;
mod ops;

pub use crate::detect::MAGIC_BYTES_LEN;

/// How an index file is packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Bzip2,
    Gzip,
    #[cfg(feature = "xz")]
    Xz,
}

//! Cache key validation.
//!
//! Keys are derived from remote URLs, so they are untrusted: a key must stay
//! inside the cache root no matter what the archive sends back.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Check that `key` is a plain relative path made only of named segments,
/// returning it with `.` segments and repeated separators removed.
///
/// Parent references, absolute paths, NUL bytes and empty keys are refused
/// outright rather than resolved.
///
/// ```
/// use std::path::Path;
/// use debsnap_cache::validate_path;
///
/// let key = validate_path("20170101034501/./binary_Packages.xz").unwrap();
/// assert_eq!(key, Path::new("20170101034501/binary_Packages.xz"));
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("/20170101034501/binary_Packages.xz").is_err());
/// ```
pub fn validate(key: impl AsRef<Path>) -> Result<PathBuf> {
    let key = key.as_ref();
    let invalid = || ErrorKind::InvalidKey(key.display().to_string());
    let mut normalized = PathBuf::new();
    for component in key.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) if !segment.as_encoded_bytes().contains(&0) => normalized.push(segment),
            _ => exn::bail!(invalid()),
        }
    }
    if normalized.as_os_str().is_empty() {
        exn::bail!(invalid());
    }
    Ok(normalized)
}

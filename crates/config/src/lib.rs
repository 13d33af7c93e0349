//! Layered configuration for debsnap.
//!
//! Values are merged, lowest priority first, from:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a TOML file (explicit path, or `debsnap.toml` in the user's config
//!    directory if it exists),
//! 3. environment variables prefixed with `DEBSNAP_`, nested keys separated
//!    by `__` (e.g. `DEBSNAP_RETRY__MAX_ATTEMPTS=3`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "DEBSNAP_";
const CONFIG_FILE: &str = "debsnap.toml";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const SOURCE_SHA256_PATTERN: &str = r"^([0-9A-Fa-f]{64})\s+\d+\s+\S+\.orig\.tar\.(?:gz|bz2|xz|lzma)$";
const SOURCE_MD5_PATTERN: &str = r"^([0-9A-Fa-f]{32})\s+\d+\s+\S+\.orig\.tar\.(?:gz|bz2|xz|lzma)$";
const BINARY_SHA256_PATTERN: &str = r"^([0-9A-Fa-f]{64})$";
const BINARY_MD5_PATTERN: &str = r"^([0-9A-Fa-f]{32})$";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "debsnap", "debsnap")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub fields: FieldsConfig,
}

/// Where snapshots live and which indexes to take from each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub suite: String,
    pub component: String,
    pub architecture: String,
    pub source_index: String,
    pub binary_index: String,
}
impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "http://snapshot.debian.org/archive/debian/".to_string(),
            suite: "stretch".to_string(),
            component: "main".to_string(),
            architecture: "amd64".to_string(),
            source_index: "Sources.xz".to_string(),
            binary_index: "Packages.xz".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// How many times a download that fails the integrity check is fetched
    /// again before the snapshot is given up on.
    pub max_corrupt_refetch: u32,
}
impl Default for CacheConfig {
    fn default() -> Self {
        let dir = project_dirs()
            .map(|dirs| dirs.cache_dir().join("snapshots"))
            .unwrap_or_else(|| PathBuf::from("snapshots"));
        Self { dir, max_corrupt_refetch: 1 }
    }
}

/// Bounded exponential backoff for transient network failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_elapsed_secs: Option<u64>,
}
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            max_elapsed_secs: Some(30 * 60),
        }
    }
}
impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// The snapshot archive serves different content to (or blocks) default
    /// client agents, so a browser agent is sent.
    pub user_agent: String,
    /// Ceiling on a whole request, body included. Large indexes over a slow
    /// link take a while, so this is generous; dead hosts are caught by
    /// `connect_timeout_secs` instead.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30 * 60,
            connect_timeout_secs: 30,
        }
    }
}
impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Which fields make two output rows "the same" package entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// `(package, version, hash_binary)`
    #[default]
    PackageVersionBinary,
    /// `hash_source` alone
    SourceHash,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of workers; `0` means one per available processing unit.
    pub concurrency: usize,
    pub identity: Identity,
}
impl PipelineConfig {
    pub fn workers(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.concurrency)
            .or_else(|| std::thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv: PathBuf,
    /// Root of the per-package policy manifests; none are written if unset.
    pub manifests: Option<PathBuf>,
    pub threshold: u32,
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from("snapshots.csv"),
            manifests: None,
            threshold: 1,
        }
    }
}

/// One way of pulling a checksum out of a stanza: the (case-insensitive)
/// field to look in, and a regular expression applied to each line of its
/// value whose first capture group is the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRule {
    pub field: String,
    pub pattern: String,
}
impl ChecksumRule {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { field: field.into(), pattern: pattern.into() }
    }
}

/// Checksum rules per index role, tried in order.
///
/// Indexes from before SHA-256 was published (roughly 2009 and earlier)
/// only carry MD5 sums (`Files` for sources, `MD5sum` for binaries), so the
/// defaults fall back to those. Such rows have 32-digit hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    pub source: Vec<ChecksumRule>,
    pub binary: Vec<ChecksumRule>,
}
impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            source: vec![
                ChecksumRule::new("checksums-sha256", SOURCE_SHA256_PATTERN),
                ChecksumRule::new("files", SOURCE_MD5_PATTERN),
            ],
            binary: vec![
                ChecksumRule::new("sha256", BINARY_SHA256_PATTERN),
                ChecksumRule::new("md5sum", BINARY_MD5_PATTERN),
            ],
        }
    }
}

impl Config {
    /// Location of the configuration file used when none is given explicitly.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// An explicit `path` must exist; the default path is only read if
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = &file {
            tracing::debug!(path = %file.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|err| ErrorKind::Invalid(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that serde can't express.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            exn::bail!(ErrorKind::Value {
                field: "retry.max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            exn::bail!(ErrorKind::Value {
                field: "retry.initial_backoff_ms",
                reason: "must not exceed retry.max_backoff_ms",
            });
        }
        if self.http.connect_timeout_secs == 0 || self.http.connect_timeout_secs > self.http.timeout_secs {
            exn::bail!(ErrorKind::Value {
                field: "http.connect_timeout_secs",
                reason: "must be between 1 and http.timeout_secs",
            });
        }
        if self.fields.source.is_empty() || self.fields.binary.is_empty() {
            exn::bail!(ErrorKind::Value {
                field: "fields",
                reason: "at least one checksum rule is required per index",
            });
        }
        Ok(())
    }
}

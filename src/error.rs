//! Top-level Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What stopped the run.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("failed to read package list")]
    Packages,
    #[display("failed to create directory {}", _0.display())]
    Bootstrap(#[error(not(source))] PathBuf),
    #[display("failed to discover snapshots")]
    Discovery,
    #[display("snapshot processing failed")]
    Pipeline,
    #[display("failed to write output")]
    Output,
}

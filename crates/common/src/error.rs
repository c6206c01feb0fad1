//! Error types for sitecheck

use thiserror::Error;

use crate::types::Suite;

/// Result type alias using the sitecheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// sitecheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Suite result already recorded: {0}")]
    DuplicateSuite(Suite),

    #[error("Invalid report name: {0}")]
    InvalidReportName(String),
}

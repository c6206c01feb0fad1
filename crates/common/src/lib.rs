//! sitecheck Common Library
//!
//! Result model, issue classification, report rendering and report
//! persistence shared by the sitecheck runner and CLI.

pub mod classifier;
pub mod error;
pub mod report;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use classifier::{classify, classify_at};
pub use error::{Error, Result};
pub use report::{draft_ticket, render};
pub use store::ReportStore;
pub use types::*;

/// sitecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory for rendered reports
pub fn default_reports_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("tests").join("reports")
}

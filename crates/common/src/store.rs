//! Report persistence

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{Error, Result};

/// Format of the stamp embedded in generated file names
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const REPORT_PREFIX: &str = "sitecheck_report";
pub const TICKET_PREFIX: &str = "bug_ticket";

/// Writes rendered reports into a fixed directory
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `text` verbatim and return its path
    ///
    /// Without a name the file is named after the current local time. An
    /// existing file with the same name is overwritten.
    pub fn save(&self, text: &str, name: Option<&str>) -> Result<PathBuf> {
        let name = match name {
            Some(name) => {
                validate_name(name)?;
                name.to_string()
            }
            None => stamped_name(REPORT_PREFIX, Local::now()),
        };
        self.write(&name, text)
    }

    /// Save a ticket draft under a stamped ticket name
    pub fn save_ticket(&self, text: &str) -> Result<PathBuf> {
        self.write(&stamped_name(TICKET_PREFIX, Local::now()), text)
    }

    fn write(&self, name: &str, text: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(name);
        std::fs::write(&path, text)?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.md`
pub fn stamped_name(prefix: &str, at: DateTime<Local>) -> String {
    format!("{}_{}.md", prefix, at.format(STAMP_FORMAT))
}

// Names are file names inside the store, never paths.
fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidReportName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamped_name_format() {
        let at = Local.with_ymd_and_hms(2024, 6, 1, 7, 5, 9).unwrap();
        assert_eq!(stamped_name(REPORT_PREFIX, at), "sitecheck_report_20240601_070509.md");
        assert_eq!(stamped_name(TICKET_PREFIX, at), "bug_ticket_20240601_070509.md");
    }

    #[test]
    fn test_save_creates_directory_and_writes_verbatim() {
        let temp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(temp.path().join("tests/reports"));

        let path = store.save("# report\n", None).unwrap();

        assert!(path.starts_with(store.dir()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("sitecheck_report_"));
        assert!(name.ends_with(".md"));
        assert_eq!(name.len(), "sitecheck_report_YYYYMMDD_HHMMSS.md".len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# report\n");
    }

    #[test]
    fn test_named_save_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(temp.path());

        let first = store.save("one", Some("run.md")).unwrap();
        let second = store.save("two", Some("run.md")).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "two");
    }

    #[test]
    fn test_rejects_path_names() {
        let temp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(temp.path());

        assert!(store.save("x", Some("../escape.md")).is_err());
        assert!(store.save("x", Some("nested/run.md")).is_err());
        assert!(store.save("x", Some("")).is_err());
    }

    #[test]
    fn test_save_ticket_uses_ticket_prefix() {
        let temp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(temp.path());

        let path = store.save_ticket("ticket").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("bug_ticket_"));
    }
}

//! On-disk store for scraped logs and run reports.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use gasprobe_protocol::Report;
use tracing::debug;

use crate::error::{Error, Result};

/// Timestamp layout embedded in every artifact file name.
pub const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Which run produced a report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
	/// Every configured test function.
	Full,
	/// A re-run of a subset.
	Rerun,
	/// Functions invoked through the script-execution API.
	Api,
}

impl ReportKind {
	fn prefix(self) -> &'static str {
		match self {
			ReportKind::Full => "test_report",
			ReportKind::Rerun => "rerun_report",
			ReportKind::Api => "api_report",
		}
	}
}

#[derive(Debug, Clone)]
pub struct LogStore {
	dir: PathBuf,
}

impl LogStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path for a per-run log file: `run_<function>_<timestamp>.log`.
	pub fn log_path(&self, test_function: &str, at: DateTime<Local>) -> PathBuf {
		self.dir
			.join(format!("run_{}_{}.log", test_function, at.format(FILE_TIMESTAMP)))
	}

	/// Path for a failure screenshot taken while running `test_function`.
	pub fn screenshot_path(&self, label: &str, test_function: &str) -> PathBuf {
		self.dir.join(format!(
			"{}_{}_{}.png",
			label,
			test_function,
			Local::now().format(FILE_TIMESTAMP)
		))
	}

	pub fn report_path(&self, kind: ReportKind, at: DateTime<Local>) -> PathBuf {
		self.dir
			.join(format!("{}_{}.json", kind.prefix(), at.format(FILE_TIMESTAMP)))
	}

	/// Writes scraped log text and returns the file path.
	///
	/// Empty (or whitespace-only) content is refused with [`Error::EmptyLog`].
	pub fn save(&self, test_function: &str, content: &str) -> Result<PathBuf> {
		self.save_at(test_function, content, Local::now())
	}

	pub fn save_at(&self, test_function: &str, content: &str, at: DateTime<Local>) -> Result<PathBuf> {
		if content.trim().is_empty() {
			return Err(Error::EmptyLog {
				test_function: test_function.to_string(),
			});
		}

		fs::create_dir_all(&self.dir)?;
		let path = self.log_path(test_function, at);
		fs::write(&path, content)?;
		debug!(target = "gasprobe", path = %path.display(), bytes = content.len(), "saved log");
		Ok(path)
	}

	/// Writes `report` as pretty JSON and returns the file path.
	pub fn save_report(&self, kind: ReportKind, report: &Report) -> Result<PathBuf> {
		fs::create_dir_all(&self.dir)?;
		let path = self.report_path(kind, report.timestamp);
		fs::write(&path, serde_json::to_string_pretty(report)?)?;
		debug!(target = "gasprobe", path = %path.display(), "saved report");
		Ok(path)
	}

	pub fn read(path: &Path) -> Result<String> {
		Ok(fs::read_to_string(path)?)
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;
	use gasprobe_protocol::{ReportSource, TestResult};
	use tempfile::TempDir;

	use super::*;

	fn fixed_time() -> DateTime<Local> {
		Local.with_ymd_and_hms(2025, 11, 3, 14, 5, 9).unwrap()
	}

	#[test]
	fn log_file_name_embeds_function_and_timestamp() {
		let tmp = TempDir::new().unwrap();
		let store = LogStore::new(tmp.path().join("logs"));

		let path = store.save_at("testAll", "=== testAll 完了 ===", fixed_time()).unwrap();

		assert_eq!(path.file_name().unwrap(), "run_testAll_20251103_140509.log");
		assert_eq!(fs::read_to_string(&path).unwrap(), "=== testAll 完了 ===");
	}

	#[test]
	fn empty_log_is_refused() {
		let tmp = TempDir::new().unwrap();
		let store = LogStore::new(tmp.path());

		let err = store.save("testAll", "  \n\t").unwrap_err();
		assert!(matches!(err, Error::EmptyLog { .. }));
		assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
	}

	#[test]
	fn report_keeps_non_ascii_text() {
		let tmp = TempDir::new().unwrap();
		let store = LogStore::new(tmp.path());
		let report = Report::build_at(
			fixed_time(),
			ReportSource::Editor,
			1,
			vec![TestResult::failed("testAll", "関数選択に失敗")],
		);

		let path = store.save_report(ReportKind::Rerun, &report).unwrap();

		assert_eq!(path.file_name().unwrap(), "rerun_report_20251103_140509.json");
		let text = fs::read_to_string(&path).unwrap();
		assert!(text.contains("関数選択に失敗"));
		let back: Report = serde_json::from_str(&text).unwrap();
		assert_eq!(back.summary.failure, 1);
	}
}

//! Per-test result records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Verdict for a single test function run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
	/// Log shows the run completed without unexpected errors.
	Passed,
	/// Positive evidence of failure (errors, incomplete run, aborted attempt).
	Failed,
	/// Nothing conclusive could be read from the run.
	Unknown,
}

impl TestOutcome {
	pub fn is_passed(self) -> bool {
		matches!(self, TestOutcome::Passed)
	}
}

impl std::fmt::Display for TestOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TestOutcome::Passed => write!(f, "passed"),
			TestOutcome::Failed => write!(f, "failed"),
			TestOutcome::Unknown => write!(f, "unknown"),
		}
	}
}

/// Result of running one test function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
	pub test_function: String,
	pub outcome: TestOutcome,
	/// Mirrors `outcome == Passed` for consumers that only read a flag.
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Unexpected error lines found in the execution log.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,
	/// Known test functions whose names appear in the log.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub functions_mentioned: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub log_file: Option<PathBuf>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screenshot: Option<PathBuf>,
	#[serde(default = "one")]
	pub attempts: u32,
}

fn one() -> u32 {
	1
}

impl TestResult {
	pub fn new(test_function: impl Into<String>, outcome: TestOutcome) -> Self {
		Self {
			test_function: test_function.into(),
			outcome,
			success: outcome.is_passed(),
			error: None,
			errors: Vec::new(),
			warnings: Vec::new(),
			functions_mentioned: Vec::new(),
			log_file: None,
			screenshot: None,
			attempts: 1,
		}
	}

	pub fn passed(test_function: impl Into<String>) -> Self {
		Self::new(test_function, TestOutcome::Passed)
	}

	/// Failed attempt carrying a reason.
	pub fn failed(test_function: impl Into<String>, error: impl Into<String>) -> Self {
		Self::new(test_function, TestOutcome::Failed).with_error(error)
	}

	pub fn unknown(test_function: impl Into<String>, error: impl Into<String>) -> Self {
		Self::new(test_function, TestOutcome::Unknown).with_error(error)
	}

	pub fn with_error(mut self, error: impl Into<String>) -> Self {
		self.error = Some(error.into());
		self
	}

	pub fn with_log_file(mut self, path: PathBuf) -> Self {
		self.log_file = Some(path);
		self
	}

	pub fn with_screenshot(mut self, path: Option<PathBuf>) -> Self {
		self.screenshot = path;
		self
	}

	/// Replaces the outcome, keeping `success` in sync.
	pub fn set_outcome(&mut self, outcome: TestOutcome) {
		self.outcome = outcome;
		self.success = outcome.is_passed();
	}

	/// Text searched when deciding whether a failure looks transient.
	pub fn error_text(&self) -> String {
		let mut text = self.error.clone().unwrap_or_default();
		for line in &self.errors {
			text.push('\n');
			text.push_str(line);
		}
		text
	}
}

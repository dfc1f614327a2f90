//! The result envelope every gasprobe command prints on stdout.
//!
//! A finished suite run looks like this in `-f json`:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "run-all",
//!   "data": { "summary": { "total": 33, "success": 31, "failure": 1, "unknown": 1 }, "results": [] },
//!   "timings": { "durationMs": 1234 },
//!   "artifacts": [{ "type": "report", "path": "logs/test_report_20260110_101500.json" }]
//! }
//! ```
//!
//! `ok` is about the command, not the tests: a run whose tests did not all
//! pass is still `ok: true` and exits with status 1. A command that could not
//! do its work (browser would not start, editor never loaded, token rejected)
//! prints `ok: false` with an `error.code` such as `NAVIGATION_FAILED`.


use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use colored::Colorize;
use gasprobe::report::render_summary;
use gasprobe_protocol::{Report, TestOutcome, TestResult};
use serde::{Deserialize, Serialize};

/// Bumped when a field of the envelope changes meaning or disappears.
pub const SCHEMA_VERSION: u32 = 1;

/// `-f/--format` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// TOON output (default, token-efficient)
	#[default]
	Toon,
	/// Pretty JSON
	Json,
	/// Newline-delimited JSON
	Ndjson,
	/// Badges and summaries for a terminal
	Text,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"toon" => Ok(OutputFormat::Toon),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			"text" => Ok(OutputFormat::Text),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Toon => write!(f, "toon"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

/// Envelope around one command's data or error.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	/// Whether the command itself succeeded
	pub ok: bool,

	/// Command name (e.g., "run", "run-all", "sheets")
	pub command: String,

	/// Functions, files and URLs the command acted on
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,

	/// Test result, report, inspection or plan; absent when `ok` is false
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Set exactly when `ok` is false
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,

	/// Files written (logs, reports, screenshots, tokens)
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub artifacts: Vec<Artifact>,

	/// Warnings and notes collected while running
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,

	/// Settings in force after merging config files and flags
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<EffectiveConfig>,
}

/// What a command was asked to act on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub functions: Vec<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,

	/// Flags specific to one command, such as `prepare` or `cohort`
	#[serde(flatten, skip_serializing_if = "Option::is_none")]
	pub extra: Option<serde_json::Value>,
}

/// Why a command could not finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Message also printed on stderr
	pub message: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable codes callers can branch on, serialized in SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Chromium did not start on the profile
	BrowserLaunchFailed,
	/// Editor or spreadsheet page did not load
	NavigationFailed,
	/// No candidate locator matched
	SelectorNotFound,
	/// A polled condition or the OAuth consent wait ran out
	Timeout,
	/// An injected page script threw
	JsEvalFailed,
	/// Screenshot could not be captured or written
	ScreenshotFailed,
	/// Log, report or config file could not be read or written
	IoError,
	/// OAuth credentials missing or rejected
	AuthError,
	/// Script-execution API rejected the call
	ApiError,
	/// Invalid input or configuration
	InvalidInput,
	/// Anything else
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::BrowserLaunchFailed => write!(f, "BROWSER_LAUNCH_FAILED"),
			ErrorCode::NavigationFailed => write!(f, "NAVIGATION_FAILED"),
			ErrorCode::SelectorNotFound => write!(f, "SELECTOR_NOT_FOUND"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::JsEvalFailed => write!(f, "JS_EVAL_FAILED"),
			ErrorCode::ScreenshotFailed => write!(f, "SCREENSHOT_FAILED"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::AuthError => write!(f, "AUTH_ERROR"),
			ErrorCode::ApiError => write!(f, "API_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	/// Wall time from command start
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// File produced by a command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
	#[serde(rename = "type")]
	pub artifact_type: ArtifactType,

	pub path: PathBuf,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub size_bytes: Option<u64>,
}

impl Artifact {
	/// Artifact for `path`, with its size when the file is readable.
	pub fn file(artifact_type: ArtifactType, path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let size_bytes = std::fs::metadata(&path).ok().map(|m| m.len());
		Self {
			artifact_type,
			path,
			size_bytes,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
	Log,
	Report,
	Screenshot,
	Token,
}

/// Artifacts referenced by a set of test results.
pub fn result_artifacts(results: &[TestResult]) -> Vec<Artifact> {
	let mut artifacts = Vec::new();
	for result in results {
		if let Some(path) = &result.log_file {
			artifacts.push(Artifact::file(ArtifactType::Log, path));
		}
		if let Some(path) = &result.screenshot {
			artifacts.push(Artifact::file(ArtifactType::Screenshot, path));
		}
	}
	artifacts
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,

	pub message: String,

	/// Where the diagnostic came from (e.g., a sheet name or function)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
	Error,
}

/// Browser and log settings a command ran with.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	pub headless: bool,

	pub profile_dir: PathBuf,

	pub logs_dir: PathBuf,

	/// Config files that were merged, lowest precedence first
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub sources: Vec<PathBuf>,
}

/// Assembles a [`CommandResult`]; `ok` follows whether an error was set.
pub struct ResultBuilder<T: Serialize> {
	schema_version: Option<u32>,
	command: String,
	inputs: Option<CommandInputs>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Option<Instant>,
	timings: Option<Timings>,
	artifacts: Vec<Artifact>,
	diagnostics: Vec<Diagnostic>,
	config: Option<EffectiveConfig>,
}

impl<T: Serialize> ResultBuilder<T> {
	/// Starts the clock for `command`.
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			schema_version: Some(SCHEMA_VERSION),
			command: command.into(),
			inputs: None,
			data: None,
			error: None,
			start_time: Some(Instant::now()),
			timings: None,
			artifacts: Vec::new(),
			diagnostics: Vec::new(),
			config: None,
		}
	}

	/// Measure duration from `start` instead of from builder creation.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = Some(start);
		self
	}

	pub fn inputs(mut self, inputs: CommandInputs) -> Self {
		self.inputs = Some(inputs);
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
			details: None,
		});
		self
	}

	pub fn artifact(mut self, artifact: Artifact) -> Self {
		self.artifacts.push(artifact);
		self
	}

	pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
		self.artifacts.extend(artifacts);
		self
	}

	pub fn diagnostic(mut self, level: DiagnosticLevel, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic {
			level,
			message: message.into(),
			source: None,
		});
		self
	}

	pub fn diagnostic_with_source(
		mut self,
		level: DiagnosticLevel,
		message: impl Into<String>,
		source: impl Into<String>,
	) -> Self {
		self.diagnostics.push(Diagnostic {
			level,
			message: message.into(),
			source: Some(source.into()),
		});
		self
	}

	pub fn config(mut self, config: EffectiveConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();

		let timings = self
			.timings
			.or_else(|| self.start_time.map(|start| Timings::from(start.elapsed())));

		CommandResult {
			schema_version: self.schema_version,
			ok,
			command: self.command,
			inputs: self.inputs,
			data: self.data,
			error: self.error,
			timings,
			artifacts: self.artifacts,
			diagnostics: self.diagnostics,
			config: self.config,
		}
	}
}

/// Writes `result` to stdout in `format`.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Toon => {
			if let Ok(json_value) = serde_json::to_value(result) {
				println!("{}", toon::encode(&json_value, None));
			}
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			print_result_text(result);
		}
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}

	print_trailer(&mut stdout, result);
}

fn print_trailer<T: Serialize>(stdout: &mut impl Write, result: &CommandResult<T>) {
	for diag in &result.diagnostics {
		let prefix = match diag.level {
			DiagnosticLevel::Info => "info",
			DiagnosticLevel::Warning => "warning",
			DiagnosticLevel::Error => "error",
		};
		if let Some(ref source) = diag.source {
			let _ = writeln!(stdout, "[{prefix}:{source}] {}", diag.message);
		} else {
			let _ = writeln!(stdout, "[{prefix}] {}", diag.message);
		}
	}

	for artifact in &result.artifacts {
		let _ = writeln!(stdout, "Saved {:?}: {}", artifact.artifact_type, artifact.path.display());
	}

	if let Some(ref timings) = result.timings {
		let _ = writeln!(stdout, "Completed in {}ms", timings.duration_ms);
	}
}

/// Prints a suite report: the envelope for machine formats, the colored
/// summary block for text.
pub fn print_report(result: &CommandResult<Report>, planned: usize, format: OutputFormat) {
	if format != OutputFormat::Text {
		print_result(result, format);
		return;
	}
	let Some(report) = &result.data else {
		print_result_text(result);
		return;
	};

	let mut stdout = io::stdout().lock();
	for test in &report.results {
		let _ = writeln!(stdout, "{} {}", outcome_badge(test.outcome), test.test_function);
	}
	let _ = writeln!(stdout);
	let _ = writeln!(stdout, "{}", render_summary(report, planned));
	let verdict = if report.all_passed() {
		"all tests passed".green().bold()
	} else {
		"some tests did not pass".red().bold()
	};
	let _ = writeln!(stdout, "{verdict}");
	print_trailer(&mut stdout, result);
}

/// Colored fixed-width outcome label.
pub fn outcome_badge(outcome: TestOutcome) -> colored::ColoredString {
	match outcome {
		TestOutcome::Passed => "PASS".green().bold(),
		TestOutcome::Failed => "FAIL".red().bold(),
		TestOutcome::Unknown => "????".yellow().bold(),
	}
}

/// One red `error [CODE]: message` line on stderr.
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);
}

use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// The envelope was printed already; exit with status 1 and print nothing
	/// else. Used when a run finished but not every test passed.
	#[error("")]
	OutputAlreadyPrinted,

	#[error("invalid configuration in {}: {message}", path.display())]
	Config { path: PathBuf, message: String },

	#[error("{0}")]
	InvalidInput(String),

	#[error(transparent)]
	Core(#[from] gasprobe::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	pub fn is_output_already_printed(&self) -> bool {
		matches!(self, CliError::OutputAlreadyPrinted)
	}

	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, message, details) = match self {
			CliError::OutputAlreadyPrinted => (ErrorCode::InternalError, String::new(), None),
			CliError::Config { path, .. } => (
				ErrorCode::InvalidInput,
				self.to_string(),
				Some(serde_json::json!({ "path": path })),
			),
			CliError::InvalidInput(msg) => (ErrorCode::InvalidInput, msg.clone(), None),
			CliError::Core(err) => core_error(err),
			CliError::Io(err) => (ErrorCode::IoError, err.to_string(), None),
			CliError::Json(err) => (ErrorCode::InternalError, format!("JSON error: {err}"), None),
		};

		CommandError { code, message, details }
	}
}

fn core_error(err: &gasprobe::Error) -> (ErrorCode, String, Option<serde_json::Value>) {
	use gasprobe::Error;

	let message = err.to_string();
	match err {
		Error::BrowserLaunch(_) => (ErrorCode::BrowserLaunchFailed, message, None),
		Error::Navigation { url, .. } => (
			ErrorCode::NavigationFailed,
			message,
			Some(serde_json::json!({ "url": url })),
		),
		Error::ElementNotFound { selector } => (
			ErrorCode::SelectorNotFound,
			message,
			Some(serde_json::json!({ "selector": selector })),
		),
		Error::JsEval(_) => (ErrorCode::JsEvalFailed, message, None),
		Error::Screenshot { path, .. } => (
			ErrorCode::ScreenshotFailed,
			message,
			Some(serde_json::json!({ "path": path })),
		),
		Error::Timeout { ms, condition } => (
			ErrorCode::Timeout,
			message,
			Some(serde_json::json!({ "timeoutMs": ms, "condition": condition })),
		),
		Error::Auth(_) => (ErrorCode::AuthError, message, None),
		Error::Api { status, .. } => (ErrorCode::ApiError, message, Some(serde_json::json!({ "status": status }))),
		Error::Config(_) | Error::Input(_) => (ErrorCode::InvalidInput, message, None),
		Error::EmptyLog { .. } | Error::Io(_) => (ErrorCode::IoError, message, None),
		Error::Http(_) => (ErrorCode::ApiError, message, None),
		Error::Json(_) | Error::Cdp(_) => (ErrorCode::InternalError, message, None),
	}
}

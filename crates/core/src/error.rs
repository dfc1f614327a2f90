use std::path::PathBuf;

use thiserror::Error;

use crate::retry;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("javascript evaluation failed: {0}")]
	JsEval(String),

	#[error("screenshot failed at {}: {message}", path.display())]
	Screenshot { path: PathBuf, message: String },

	#[error("input dispatch failed: {0}")]
	Input(String),

	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	/// Scraped log content was empty; nothing is written.
	#[error("refusing to save an empty log for {test_function}")]
	EmptyLog { test_function: String },

	#[error("authorization failed: {0}")]
	Auth(String),

	#[error("script API returned HTTP {status}: {message}")]
	Api { status: u16, message: String },

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Cdp(#[from] chromiumoxide::error::CdpError),

	#[error(transparent)]
	Http(#[from] reqwest::Error),
}

impl Error {
	/// Network-level failures worth retrying (see [`retry::is_transient`]).
	pub fn is_transient(&self) -> bool {
		retry::is_transient(&self.to_string())
	}
}

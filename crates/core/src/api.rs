//! Remote function execution through the script-execution API.

use std::path::PathBuf;

use async_trait::async_trait;
use gasprobe_protocol::{ExecutionOutcome, ExecutionRequest, Operation, ReportSource, Status, TestResult};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::logstore::LogStore;
use crate::suite::FunctionRunner;

pub const API_BASE: &str = "https://script.googleapis.com/v1";

/// Google error envelope: `{ "error": { "code", "message", "status" } }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
	error: Status,
}

#[derive(Debug, Clone)]
pub struct ScriptClient {
	http: reqwest::Client,
	base: String,
	script_id: String,
	access_token: String,
}

impl ScriptClient {
	pub fn new(script_id: impl Into<String>, access_token: impl Into<String>) -> Self {
		Self::with_base(API_BASE, script_id, access_token)
	}

	pub fn with_base(base: impl Into<String>, script_id: impl Into<String>, access_token: impl Into<String>) -> Self {
		Self {
			http: reqwest::Client::new(),
			base: base.into().trim_end_matches('/').to_string(),
			script_id: script_id.into(),
			access_token: access_token.into(),
		}
	}

	fn run_url(&self) -> String {
		format!("{}/scripts/{}:run", self.base, self.script_id)
	}

	/// Calls one function. A thrown script error is an `Ok(Failure)`; only a
	/// rejected call or a transport failure is an `Err`.
	pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome> {
		debug!(target = "gasprobe", function = %request.function, url = %self.run_url(), "scripts.run");
		let response = self
			.http
			.post(self.run_url())
			.bearer_auth(&self.access_token)
			.json(request)
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			let message = serde_json::from_str::<ErrorBody>(&body)
				.ok()
				.and_then(|b| b.error.message)
				.unwrap_or_else(|| body.trim().to_string());
			return Err(Error::Api {
				status: status.as_u16(),
				message,
			});
		}

		let operation: Operation = serde_json::from_str(&body)?;
		Ok(ExecutionOutcome::from(operation))
	}
}

/// [`FunctionRunner`] backed by [`ScriptClient`].
pub struct ApiRunner {
	client: ScriptClient,
	dev_mode: bool,
	store: Option<LogStore>,
}

impl ApiRunner {
	pub fn new(client: ScriptClient, dev_mode: bool) -> Self {
		Self {
			client,
			dev_mode,
			store: None,
		}
	}

	/// Saves returned log lines under `store`.
	pub fn with_store(mut self, store: LogStore) -> Self {
		self.store = Some(store);
		self
	}

	/// Saves the returned log lines. A blank log is skipped and a failed write
	/// only warns: the verdict comes from the API, not from the file.
	fn save_logs(&self, function: &str, logs: &[String]) -> Option<PathBuf> {
		let store = self.store.as_ref()?;
		if logs.iter().all(|line| line.trim().is_empty()) {
			return None;
		}
		match store.save(function, &logs.join("\n")) {
			Ok(path) => Some(path),
			Err(err) => {
				warn!(target = "gasprobe", function, error = %err, "could not save api log");
				None
			}
		}
	}
}

/// Maps one API outcome to a result.
pub fn outcome_to_result(function: &str, outcome: &ExecutionOutcome) -> TestResult {
	match outcome {
		ExecutionOutcome::Success { .. } => TestResult::passed(function),
		ExecutionOutcome::Failure {
			message,
			error_type,
			stack,
		} => {
			let mut result = TestResult::failed(function, message.clone());
			if let Some(kind) = error_type {
				result.errors.push(format!("{kind}: {message}"));
			}
			result.errors.extend(stack.iter().map(|frame| format!("at {frame}")));
			result
		}
	}
}

#[async_trait]
impl FunctionRunner for ApiRunner {
	fn source(&self) -> ReportSource {
		ReportSource::Api
	}

	async fn run(&mut self, function: &str) -> Result<TestResult> {
		let request = ExecutionRequest::new(function).dev_mode(self.dev_mode);
		let outcome = self.client.run(&request).await?;
		info!(target = "gasprobe", function, success = outcome.is_success(), "api call finished");

		let mut result = outcome_to_result(function, &outcome);
		if let Some(path) = self.save_logs(function, &outcome.logs()) {
			result = result.with_log_file(path);
		}
		Ok(result)
	}
}

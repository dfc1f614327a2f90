//! Wire types for the remote script-execution API (`scripts.run`).
//!
//! The API answers every call with an [`Operation`]. A finished operation
//! carries either a `response` (the function returned) or an `error` (the
//! function threw, or the call was rejected). [`ExecutionOutcome`] folds the
//! two into a single value so callers never see "neither".

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/scripts/{scriptId}:run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
	pub function: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub parameters: Vec<serde_json::Value>,
	/// Run the most recently saved code instead of the deployed version.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dev_mode: Option<bool>,
}

impl ExecutionRequest {
	pub fn new(function: impl Into<String>) -> Self {
		Self {
			function: function.into(),
			parameters: Vec::new(),
			dev_mode: None,
		}
	}

	pub fn dev_mode(mut self, enabled: bool) -> Self {
		self.dev_mode = Some(enabled);
		self
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub done: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<OperationResponse>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
	#[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
	pub type_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
	#[serde(default)]
	pub code: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub details: Vec<ExecutionError>,
}

/// Detail entry attached to a failed execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_type: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub script_stack_trace_elements: Vec<StackFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub function: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub line_number: Option<u32>,
}

impl std::fmt::Display for StackFrame {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let function = self.function.as_deref().unwrap_or("<anonymous>");
		match self.line_number {
			Some(line) => write!(f, "{function}:{line}"),
			None => write!(f, "{function}"),
		}
	}
}

/// Result of one remote function call: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
	Success {
		#[serde(default)]
		result: serde_json::Value,
	},
	Failure {
		message: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error_type: Option<String>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		stack: Vec<StackFrame>,
	},
}

impl ExecutionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, ExecutionOutcome::Success { .. })
	}

	/// Log lines a test function returned as `{ logs: [...] }`, if any.
	pub fn logs(&self) -> Vec<String> {
		match self {
			ExecutionOutcome::Success { result } => result
				.get("logs")
				.and_then(|logs| logs.as_array())
				.map(|logs| {
					logs.iter()
						.map(|line| match line.as_str() {
							Some(s) => s.to_string(),
							None => line.to_string(),
						})
						.collect()
				})
				.unwrap_or_default(),
			ExecutionOutcome::Failure { .. } => Vec::new(),
		}
	}
}

impl From<Operation> for ExecutionOutcome {
	fn from(op: Operation) -> Self {
		if let Some(status) = op.error {
			let detail = status.details.into_iter().next().unwrap_or_default();
			let message = detail
				.error_message
				.or(status.message)
				.unwrap_or_else(|| format!("execution failed (code {})", status.code));
			return ExecutionOutcome::Failure {
				message,
				error_type: detail.error_type,
				stack: detail.script_stack_trace_elements,
			};
		}

		match op.response {
			Some(response) => ExecutionOutcome::Success {
				result: response.result.unwrap_or(serde_json::Value::Null),
			},
			None => ExecutionOutcome::Failure {
				message: "empty response".into(),
				error_type: None,
				stack: Vec::new(),
			},
		}
	}
}

//! Sequential suite execution over a [`FunctionRunner`].

use std::time::Duration;

use async_trait::async_trait;
use gasprobe_protocol::{ReportSource, TestResult};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::Result;
use crate::retry::RetryPolicy;

/// Runs one named test function and reports what happened.
///
/// Implementations return `Ok` for any run that produced a verdict, including
/// failed ones; `Err` is reserved for the run itself breaking (navigation,
/// browser, transport).
#[async_trait]
pub trait FunctionRunner: Send {
	fn source(&self) -> ReportSource;

	async fn run(&mut self, function: &str) -> Result<TestResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct SuiteOptions {
	pub policy: RetryPolicy,
	/// Pause between consecutive functions.
	pub pause: Duration,
}

impl Default for SuiteOptions {
	fn default() -> Self {
		Self {
			policy: RetryPolicy::full_run(),
			pause: Duration::from_secs(10),
		}
	}
}

/// Runs `function`, retrying transient failures per `policy`.
///
/// Runner errors become `Failed` results carrying the error text. The returned
/// result records how many attempts were made.
pub async fn run_with_retry<R>(runner: &mut R, function: &str, policy: &RetryPolicy) -> TestResult
where
	R: FunctionRunner + ?Sized,
{
	let mut attempt = 1;
	loop {
		let (mut result, retry) = match runner.run(function).await {
			Ok(result) => {
				let retry = policy.should_retry(attempt, &result);
				(result, retry)
			}
			Err(err) => {
				let retry = policy.has_budget(attempt) && err.is_transient();
				(TestResult::failed(function, err.to_string()), retry)
			}
		};
		result.attempts = attempt;

		if !retry {
			return result;
		}

		warn!(
			target = "gasprobe",
			function,
			attempt,
			max = policy.max_attempts,
			"network error, retrying"
		);
		sleep(policy.backoff).await;
		attempt += 1;
	}
}

/// Runs `functions` in order and returns one result per function.
pub async fn run_suite<R>(runner: &mut R, functions: &[String], options: &SuiteOptions) -> Vec<TestResult>
where
	R: FunctionRunner + ?Sized,
{
	let total = functions.len();
	let mut results = Vec::with_capacity(total);

	for (idx, function) in functions.iter().enumerate() {
		info!(target = "gasprobe", "[{}/{}] {}", idx + 1, total, function);

		let result = run_with_retry(runner, function, &options.policy).await;
		match &result.error {
			Some(error) => info!(target = "gasprobe", function = %function, outcome = %result.outcome, error = %error, "done"),
			None => info!(target = "gasprobe", function = %function, outcome = %result.outcome, "done"),
		}
		results.push(result);

		if idx + 1 < total && !options.pause.is_zero() {
			sleep(options.pause).await;
		}
	}

	results
}

#[cfg(test)]
mod tests {
	use std::collections::{HashMap, VecDeque};

	use gasprobe_protocol::TestOutcome;

	use super::*;
	use crate::error::Error;

	/// Replays scripted responses per function; unscripted functions pass.
	#[derive(Default)]
	struct ScriptedRunner {
		responses: HashMap<String, VecDeque<Result<TestResult>>>,
		calls: Vec<String>,
	}

	impl ScriptedRunner {
		fn script(mut self, function: &str, responses: Vec<Result<TestResult>>) -> Self {
			self.responses.insert(function.to_string(), responses.into());
			self
		}
	}

	#[async_trait]
	impl FunctionRunner for ScriptedRunner {
		fn source(&self) -> ReportSource {
			ReportSource::Editor
		}

		async fn run(&mut self, function: &str) -> Result<TestResult> {
			self.calls.push(function.to_string());
			self.responses
				.get_mut(function)
				.and_then(|queue| queue.pop_front())
				.unwrap_or_else(|| Ok(TestResult::passed(function)))
		}
	}

	fn instant(policy: RetryPolicy) -> SuiteOptions {
		SuiteOptions {
			policy: RetryPolicy {
				backoff: Duration::ZERO,
				..policy
			},
			pause: Duration::ZERO,
		}
	}

	fn network_down() -> Result<TestResult> {
		Err(Error::Navigation {
			url: "https://script.google.com/".into(),
			message: "net::ERR_ADDRESS_UNREACHABLE".into(),
		})
	}

	fn functions(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[tokio::test]
	async fn runs_functions_in_order() {
		let mut runner = ScriptedRunner::default();
		let results = run_suite(&mut runner, &functions(&["testA", "testB", "testC"]), &instant(RetryPolicy::full_run())).await;

		assert_eq!(runner.calls, vec!["testA", "testB", "testC"]);
		assert!(results.iter().all(|r| r.outcome == TestOutcome::Passed && r.attempts == 1));
	}

	#[tokio::test]
	async fn transient_error_is_retried_and_attempts_recorded() {
		let mut runner = ScriptedRunner::default().script(
			"testAll",
			vec![network_down(), Ok(TestResult::passed("testAll"))],
		);
		let results = run_suite(&mut runner, &functions(&["testAll"]), &instant(RetryPolicy::full_run())).await;

		assert_eq!(runner.calls.len(), 2);
		assert_eq!(results[0].outcome, TestOutcome::Passed);
		assert_eq!(results[0].attempts, 2);
	}

	#[tokio::test]
	async fn retries_stop_at_the_limit() {
		let mut runner = ScriptedRunner::default().script(
			"testAll",
			vec![network_down(), network_down(), network_down(), network_down()],
		);
		let results = run_suite(&mut runner, &functions(&["testAll"]), &instant(RetryPolicy::rerun())).await;

		assert_eq!(runner.calls.len(), 3);
		assert_eq!(results[0].outcome, TestOutcome::Failed);
		assert_eq!(results[0].attempts, 3);
		assert!(results[0].error.as_deref().unwrap().contains("ERR_ADDRESS_UNREACHABLE"));
	}

	#[tokio::test]
	async fn non_transient_failure_is_final() {
		let mut runner = ScriptedRunner::default().script(
			"testEditHandler",
			vec![Ok(TestResult::failed("testEditHandler", "run button not found"))],
		);
		let results = run_suite(&mut runner, &functions(&["testEditHandler"]), &instant(RetryPolicy::rerun())).await;

		assert_eq!(runner.calls.len(), 1);
		assert_eq!(results[0].error.as_deref(), Some("run button not found"));
	}

	#[tokio::test]
	async fn network_text_in_scraped_log_is_not_retried() {
		let mut scraped = TestResult::failed("testAll", "1 unexpected error line(s)");
		scraped.errors.push("❌ UrlFetch failed: ERR_ADDRESS_UNREACHABLE".into());
		let mut runner = ScriptedRunner::default().script("testAll", vec![Ok(scraped)]);
		let results = run_suite(&mut runner, &functions(&["testAll"]), &instant(RetryPolicy::rerun())).await;

		assert_eq!(runner.calls.len(), 1);
		assert_eq!(results[0].attempts, 1);
	}

	#[tokio::test]
	async fn runner_errors_become_failed_results() {
		let mut runner = ScriptedRunner::default().script(
			"testB",
			vec![Err(Error::JsEval("Execution context was destroyed".into()))],
		);
		let results = run_suite(&mut runner, &functions(&["testA", "testB", "testC"]), &instant(RetryPolicy::full_run())).await;

		assert_eq!(runner.calls, vec!["testA", "testB", "testC"]);
		assert_eq!(results.len(), 3);
		assert_eq!(results[1].outcome, TestOutcome::Failed);
		assert!(results[1].error.as_deref().unwrap().contains("Execution context was destroyed"));
		assert_eq!(results[2].outcome, TestOutcome::Passed);
	}
}

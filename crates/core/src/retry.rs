//! Retry policy for network-level failures.
//!
//! Only failures whose text carries one of the Chromium network error codes in
//! [`TRANSIENT_MARKERS`] are retried. Everything else, including a run that
//! completed with failing assertions, is final on the first attempt.

use std::time::Duration;

use gasprobe_protocol::TestResult;

pub const TRANSIENT_MARKERS: &[&str] = &["ERR_ADDRESS_UNREACHABLE", "ERR_NETWORK_CHANGED", "ERR_INTERNET_DISCONNECTED"];

pub fn is_transient(text: &str) -> bool {
	TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub backoff: Duration,
}

impl RetryPolicy {
	/// Policy for a full suite run: two attempts, five seconds apart.
	pub fn full_run() -> Self {
		Self {
			max_attempts: 2,
			backoff: Duration::from_secs(5),
		}
	}

	/// Policy for re-running previously failed functions.
	pub fn rerun() -> Self {
		Self {
			max_attempts: 3,
			backoff: Duration::from_secs(10),
		}
	}

	pub fn once() -> Self {
		Self {
			max_attempts: 1,
			backoff: Duration::ZERO,
		}
	}

	/// Whether attempt number `attempt` (1-based) leaves room for another.
	pub fn has_budget(&self, attempt: u32) -> bool {
		attempt < self.max_attempts
	}

	/// Whether another attempt should follow `result`, which came from attempt
	/// number `attempt`. Only the top-level error counts; scraped log lines
	/// belong to the script under test.
	pub fn should_retry(&self, attempt: u32, result: &TestResult) -> bool {
		self.has_budget(attempt) && !result.outcome.is_passed() && result.error.as_deref().is_some_and(is_transient)
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::full_run()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_network_codes() {
		assert!(is_transient("page.goto: net::ERR_ADDRESS_UNREACHABLE at https://script.google.com"));
		assert!(is_transient("ERR_NETWORK_CHANGED"));
		assert!(!is_transient("run button not found"));
	}

	#[test]
	fn retries_only_transient_failures_within_budget() {
		let policy = RetryPolicy::rerun();
		let transient = TestResult::failed("testAll", "net::ERR_INTERNET_DISCONNECTED");
		let final_failure = TestResult::failed("testAll", "function selection failed");

		assert!(policy.should_retry(1, &transient));
		assert!(policy.should_retry(2, &transient));
		assert!(!policy.should_retry(3, &transient));
		assert!(!policy.should_retry(1, &final_failure));
	}

	#[test]
	fn transient_text_in_log_errors_is_final() {
		let mut result = TestResult::failed("testAll", "1 unexpected error line(s)");
		result.errors.push("❌ UrlFetch failed: ERR_ADDRESS_UNREACHABLE".into());
		assert!(!RetryPolicy::full_run().should_retry(1, &result));
		assert!(!RetryPolicy::rerun().should_retry(1, &result));
	}

	#[test]
	fn passed_results_never_retry() {
		let mut result = TestResult::passed("testAll");
		result.error = Some("ERR_NETWORK_CHANGED".into());
		assert!(!RetryPolicy::full_run().should_retry(1, &result));
	}
}

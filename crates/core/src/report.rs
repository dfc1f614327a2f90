//! Human-readable rendering of a [`Report`].

use std::fmt::Write;

use gasprobe_protocol::Report;

/// Error lines shown per failing test.
const ERROR_LINES_SHOWN: usize = 3;
const ERROR_LINE_WIDTH: usize = 100;

/// Renders the end-of-run summary block.
pub fn render_summary(report: &Report, planned: usize) -> String {
	let s = &report.summary;
	let mut out = String::new();

	let _ = writeln!(out, "passed:   {}/{}", s.success, planned);
	let _ = writeln!(out, "failed:   {}/{}", s.failure, planned);
	if s.unknown > 0 {
		let _ = writeln!(out, "unknown:  {}/{} (counted as not passed)", s.unknown, planned);
	}
	let _ = writeln!(out, "coverage: {}/{} ({:.1}%)", s.coverage, planned, s.coverage_percentage);

	let mut not_passed = report.not_passed().peekable();
	if not_passed.peek().is_some() {
		let _ = writeln!(out, "\nnot passed:");
		for result in not_passed {
			let _ = writeln!(out, "  - {} [{}]", result.test_function, result.outcome);
			for line in result.errors.iter().take(ERROR_LINES_SHOWN) {
				let _ = writeln!(out, "    {}", truncate(line, ERROR_LINE_WIDTH));
			}
			if let Some(error) = &result.error {
				let _ = writeln!(out, "    error: {error}");
			}
		}
	}

	out
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
	match text.char_indices().nth(max) {
		Some((idx, _)) => format!("{}...", &text[..idx]),
		None => text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use gasprobe_protocol::{ReportSource, TestResult};

	use super::*;

	#[test]
	fn summary_lists_failures_with_first_errors() {
		let mut failed = TestResult::failed("testEditHandler", "2 unexpected error line(s)");
		failed.errors = vec!["❌ a".into(), "❌ b".into(), "❌ c".into(), "❌ d".into()];
		let report = Report::build(
			ReportSource::Editor,
			3,
			vec![TestResult::passed("testAll"), failed, TestResult::unknown("testX", "result undetermined")],
		);

		let text = render_summary(&report, 3);

		assert!(text.contains("passed:   1/3"));
		assert!(text.contains("unknown:  1/3"));
		assert!(text.contains("coverage: 3/3 (100.0%)"));
		assert!(text.contains("testEditHandler [failed]"));
		assert!(text.contains("❌ c"));
		assert!(!text.contains("❌ d"));
		assert!(text.contains("testX [unknown]"));
	}

	#[test]
	fn all_passed_has_no_failure_block() {
		let report = Report::build(ReportSource::Api, 1, vec![TestResult::passed("testAll")]);
		let text = render_summary(&report, 1);
		assert!(!text.contains("not passed:"));
		assert!(!text.contains("unknown:"));
	}

	#[test]
	fn truncate_counts_characters() {
		assert_eq!(truncate("予約一覧の更新", 4), "予約一覧...");
		assert_eq!(truncate("short", 10), "short");
	}
}

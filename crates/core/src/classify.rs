//! Verdicts from scraped execution-log text.
//!
//! The editor only exposes what the script printed, so the verdict is a
//! keyword scan over that text. [`classify`] applies the checks in a fixed
//! order and returns the evidence it used alongside the outcome.

use gasprobe_protocol::{TestOutcome, TestResult};
use serde::Serialize;

/// Logs shorter than this (after trimming) carry no usable signal.
pub const MIN_LOG_CHARS: usize = 100;

pub const LOADING_MARKER: &str = "読み込んでいます";
pub const COMPLETED_MARKER: &str = "完了";
pub const STARTED_MARKER: &str = "開始";
pub const PASS_MARK: &str = "✅";
pub const FAIL_MARK: &str = "❌";

const BOOTSTRAP_NOISE: &[&str] = &["window.WIZ_global_data", "AF_initDataCallback"];

pub const ERROR_KEYWORDS: &[&str] = &["❌", "エラー", "Error", "Exception", "失敗", "Failed"];

const WARNING_KEYWORDS: &[&str] = &["⚠️", "警告", "Warning"];

/// Phrases near an error line showing the error was the point of the test.
const EXPECTED_PHRASES: &[&str] = &[
	"期待値通り",
	"適切にエラーを返しています",
	"クラッシュしないことを確認",
	"エラー時にnullを返して",
	"エラー時にfalseを返して",
	"エラー時にisValid=falseを返して",
	"✅",
];

/// Lines before and after an error line searched for [`EXPECTED_PHRASES`].
const CONTEXT_BEFORE: usize = 5;
const CONTEXT_AFTER: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
	pub outcome: TestOutcome,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	pub functions_mentioned: Vec<String>,
}

impl Classification {
	fn verdict(outcome: TestOutcome, error: Option<String>) -> Self {
		Self {
			outcome,
			error,
			errors: Vec::new(),
			warnings: Vec::new(),
			functions_mentioned: Vec::new(),
		}
	}

	pub fn into_result(self, test_function: impl Into<String>) -> TestResult {
		let mut result = TestResult::new(test_function, self.outcome);
		result.error = self.error;
		result.errors = self.errors;
		result.warnings = self.warnings;
		result.functions_mentioned = self.functions_mentioned;
		result
	}
}

/// Classifies one execution log.
///
/// `known` lists every test function name worth reporting as mentioned.
/// `expected_error_tests` names tests that deliberately provoke errors; when
/// the log mentions one of them, error lines surrounded by an expected-outcome
/// phrase are not counted.
pub fn classify(log: &str, known: &[String], expected_error_tests: &[String]) -> Classification {
	if log.trim().chars().count() < MIN_LOG_CHARS {
		return Classification::verdict(TestOutcome::Unknown, Some("log too short".into()));
	}

	let content = strip_bootstrap_noise(log);
	let lines: Vec<&str> = content.split('\n').collect();

	let started = lines.iter().any(|line| line.contains(STARTED_MARKER) && mentions_test(line));
	let completed = lines.iter().any(|line| line.contains(COMPLETED_MARKER) && mentions_test(line));

	let is_error_test = expected_error_tests.iter().any(|name| content.contains(name.as_str()));
	let errors = unexpected_errors(&lines, is_error_test);

	let warnings = lines
		.iter()
		.map(|line| line.trim())
		.filter(|line| !line.is_empty() && !line.starts_with("window."))
		.filter(|line| WARNING_KEYWORDS.iter().any(|k| line.contains(k)))
		.map(String::from)
		.collect();

	let functions_mentioned = known
		.iter()
		.filter(|name| content.contains(name.as_str()))
		.cloned()
		.collect();

	let has_pass_mark = content.contains(PASS_MARK);
	let has_completed = content.contains(COMPLETED_MARKER);

	let (outcome, error) = if content.contains(LOADING_MARKER) && !has_completed {
		(TestOutcome::Failed, Some("log incomplete (still loading)".to_string()))
	} else if completed && errors.is_empty() {
		(TestOutcome::Passed, None)
	} else if completed {
		if is_error_test && has_pass_mark {
			(TestOutcome::Passed, None)
		} else {
			(TestOutcome::Failed, Some(format!("{} unexpected error line(s)", errors.len())))
		}
	} else if has_pass_mark && has_completed && errors.is_empty() {
		(TestOutcome::Passed, None)
	} else if content.contains(FAIL_MARK) && !errors.is_empty() {
		(TestOutcome::Failed, Some(format!("{} unexpected error line(s)", errors.len())))
	} else if started {
		(TestOutcome::Failed, Some("test did not complete".to_string()))
	} else {
		(TestOutcome::Unknown, Some("result undetermined".to_string()))
	};

	Classification {
		outcome,
		error,
		errors,
		warnings,
		functions_mentioned,
	}
}

fn mentions_test(line: &str) -> bool {
	line.to_lowercase().contains("test") || line.contains("テスト")
}

/// Drops page-bootstrap script lines that leak into scraped text.
fn strip_bootstrap_noise(log: &str) -> String {
	if !BOOTSTRAP_NOISE.iter().any(|marker| log.contains(marker)) {
		return log.to_string();
	}

	log.split('\n')
		.filter(|line| {
			let trimmed = line.trim();
			!trimmed.is_empty()
				&& !trimmed.starts_with("window.")
				&& !line.contains("AF_initDataCallback")
				&& !line.contains("window[\"_F_toggles")
				&& !line.contains("window.IJ_values")
		})
		.collect::<Vec<_>>()
		.join("\n")
}

fn is_error_line(line: &str) -> bool {
	ERROR_KEYWORDS.iter().any(|k| line.contains(k))
}

fn unexpected_errors(lines: &[&str], is_error_test: bool) -> Vec<String> {
	let mut errors = Vec::new();

	for (i, line) in lines.iter().enumerate() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with("window.") || !is_error_line(line) {
			continue;
		}

		if is_error_test {
			let start = i.saturating_sub(CONTEXT_BEFORE);
			let end = (i + CONTEXT_AFTER).min(lines.len());
			let context = lines[start..end].join(" ");
			if EXPECTED_PHRASES.iter().any(|p| context.contains(p)) {
				continue;
			}
		}

		errors.push(trimmed.to_string());
	}

	errors
}

/// How a watched function shows up in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mention {
	Passed,
	Error,
	Warning,
	Executed,
	NotSeen,
}

impl std::fmt::Display for Mention {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Mention::Passed => "passed",
			Mention::Error => "error",
			Mention::Warning => "warning",
			Mention::Executed => "executed",
			Mention::NotSeen => "not seen",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMention {
	pub function: String,
	pub mention: Mention,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub line: Option<String>,
}

/// Reports, for each watched function, how its first mentioning line reads.
pub fn mentions(log: &str, watched: &[String]) -> Vec<FunctionMention> {
	watched
		.iter()
		.map(|function| {
			let found = log.split('\n').find(|line| line.contains(function.as_str()));
			let mention = match found {
				None => Mention::NotSeen,
				Some(line) if line.contains(PASS_MARK) || line.contains("成功") => Mention::Passed,
				Some(line) if line.contains(FAIL_MARK) || line.contains("エラー") || line.contains("Error") => Mention::Error,
				Some(line) if line.contains("⚠️") || line.contains("警告") => Mention::Warning,
				Some(_) => Mention::Executed,
			};
			FunctionMention {
				function: function.clone(),
				mention,
				line: found.map(|l| l.trim().to_string()),
			}
		})
		.collect()
}

/// Every line containing an error keyword, trimmed.
pub fn error_lines(log: &str) -> Vec<String> {
	log.split('\n')
		.filter(|line| is_error_line(line))
		.map(|line| line.trim().to_string())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	fn known() -> Vec<String> {
		names(&["testSheetFunctions", "testErrorHandling", "testAll", "testCancelReservation"])
	}

	fn expected() -> Vec<String> {
		names(&["testInvalidInputs", "testErrorHandling", "testDataInconsistency", "testAllBoundaryAndEdgeCases"])
	}

	/// Pads a log past the minimum length with neutral lines.
	fn log(lines: &[&str]) -> String {
		let mut text = lines.join("\n");
		text.push('\n');
		while text.chars().count() < MIN_LOG_CHARS + 20 {
			text.push_str("12:00:00 情報 処理中\n");
		}
		text
	}

	fn run(text: &str) -> Classification {
		classify(text, &known(), &expected())
	}

	#[test]
	fn short_log_is_unknown() {
		let c = run("=== testAll 開始 ===\n=== testAll 完了 ===");
		assert_eq!(c.outcome, TestOutcome::Unknown);
		assert_eq!(c.error.as_deref(), Some("log too short"));
	}

	#[test]
	fn completed_without_errors_passes() {
		let c = run(&log(&["=== testSheetFunctions 開始 ===", "✅ getSheet OK", "=== testSheetFunctions 完了 ==="]));
		assert_eq!(c.outcome, TestOutcome::Passed);
		assert!(c.errors.is_empty());
		assert_eq!(c.functions_mentioned, vec!["testSheetFunctions"]);
	}

	#[test]
	fn loading_marker_without_completion_fails() {
		let c = run(&log(&["=== testAll 開始 ===", "読み込んでいます..."]));
		assert_eq!(c.outcome, TestOutcome::Failed);
		assert_eq!(c.error.as_deref(), Some("log incomplete (still loading)"));
	}

	#[test]
	fn loading_marker_check_precedes_completion() {
		// 完了 anywhere in the text defuses the loading check.
		let c = run(&log(&["=== testAll 開始 ===", "読み込んでいます...", "=== testAll 完了 ==="]));
		assert_eq!(c.outcome, TestOutcome::Passed);
	}

	#[test]
	fn completed_with_unexpected_error_fails() {
		let c = run(&log(&[
			"=== testCancelReservation 開始 ===",
			"❌ cancelReservation: TypeError: x is undefined",
			"=== testCancelReservation 完了 ===",
		]));
		assert_eq!(c.outcome, TestOutcome::Failed);
		assert_eq!(c.errors, vec!["❌ cancelReservation: TypeError: x is undefined"]);
	}

	#[test]
	fn expected_error_is_excused_by_nearby_phrase() {
		let c = run(&log(&[
			"=== testErrorHandling 開始 ===",
			"Error: invalid reservation id",
			"✅ エラー時にnullを返しています",
			"=== testErrorHandling 完了 ===",
		]));
		assert_eq!(c.outcome, TestOutcome::Passed);
		assert!(c.errors.is_empty());
	}

	#[test]
	fn expected_error_test_with_stray_error_still_passes_on_pass_mark() {
		let mut lines = vec!["=== testErrorHandling 開始 ===", "✅ 検証 OK"];
		lines.extend(std::iter::repeat_n("ログ行", 12));
		lines.push("Exception: boom");
		lines.extend(std::iter::repeat_n("ログ行", 12));
		lines.push("✅ 全チェック OK");
		lines.push("=== testErrorHandling 完了 ===");

		let c = run(&log(&lines));
		assert_eq!(c.errors, vec!["Exception: boom"]);
		assert_eq!(c.outcome, TestOutcome::Passed);
	}

	#[test]
	fn errors_outside_expected_error_tests_are_not_excused() {
		let c = run(&log(&[
			"=== testSheetFunctions 開始 ===",
			"Error: sheet missing",
			"✅ fallback",
			"=== testSheetFunctions 完了 ===",
		]));
		assert_eq!(c.outcome, TestOutcome::Failed);
		assert_eq!(c.errors, vec!["Error: sheet missing"]);
	}

	#[test]
	fn pass_mark_and_completion_word_pass_without_completion_line() {
		// 完了 appears, but never on a line that mentions a test.
		let c = run(&log(&["処理を開始", "✅ 予約を更新", "同期完了"]));
		assert_eq!(c.outcome, TestOutcome::Passed);
	}

	#[test]
	fn fail_mark_without_completion_fails() {
		let c = run(&log(&["処理", "❌ カレンダー更新 失敗"]));
		assert_eq!(c.outcome, TestOutcome::Failed);
		assert_eq!(c.errors.len(), 1);
	}

	#[test]
	fn started_without_completion_fails() {
		let c = run(&log(&["=== testAll 開始 ===", "step 1", "step 2"]));
		assert_eq!(c.outcome, TestOutcome::Failed);
		assert_eq!(c.error.as_deref(), Some("test did not complete"));
	}

	#[test]
	fn nothing_conclusive_is_unknown() {
		let c = run(&log(&["12:00 実行", "no markers here"]));
		assert_eq!(c.outcome, TestOutcome::Unknown);
		assert_eq!(c.error.as_deref(), Some("result undetermined"));
	}

	#[test]
	fn bootstrap_noise_is_stripped() {
		let text = log(&[
			"window.WIZ_global_data = {\"Error\": 1};",
			"AF_initDataCallback({key: 'ds:0', data: 'Exception'});",
			"=== testAll 開始 ===",
			"=== testAll 完了 ===",
		]);
		let c = run(&text);
		assert_eq!(c.outcome, TestOutcome::Passed);
		assert!(c.errors.is_empty());
	}

	#[test]
	fn collects_warnings() {
		let c = run(&log(&["=== testAll 開始 ===", "⚠️ 予約が見つかりません", "Warning: slow", "=== testAll 完了 ==="]));
		assert_eq!(c.warnings, vec!["⚠️ 予約が見つかりません", "Warning: slow"]);
	}

	#[test]
	fn into_result_carries_evidence() {
		let c = run(&log(&["=== testAll 開始 ===", "❌ Failed: x", "=== testAll 完了 ==="]));
		let result = c.into_result("testAll");
		assert!(!result.success);
		assert_eq!(result.errors.len(), 1);
		assert_eq!(result.functions_mentioned, vec!["testAll"]);
	}

	#[test]
	fn mentions_classify_first_line() {
		let text = "testEditHandler ✅ 成功\ntestOnDashboardAction: エラー発生\ntestOnCreatingSchedule ⚠️ 警告\ntestChangeReservation 実行";
		let watched = names(&[
			"testEditHandler",
			"testOnDashboardAction",
			"testOnCreatingSchedule",
			"testChangeReservation",
			"testEnhancedFunctions",
		]);
		let found: Vec<Mention> = mentions(text, &watched).into_iter().map(|m| m.mention).collect();
		assert_eq!(
			found,
			vec![Mention::Passed, Mention::Error, Mention::Warning, Mention::Executed, Mention::NotSeen]
		);
	}

	#[test]
	fn error_lines_are_trimmed() {
		let lines = error_lines("  ok\n  ❌ broke  \nException thrown");
		assert_eq!(lines, vec!["❌ broke", "Exception thrown"]);
	}
}

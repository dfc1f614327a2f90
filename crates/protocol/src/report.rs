//! Aggregate report written after a suite run.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::result::{TestOutcome, TestResult};

/// Which surface produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
	/// Scraped from the script editor UI.
	Editor,
	/// Returned by the script-execution API.
	Api,
}

/// Outcome counts for a run.
///
/// `success + failure + unknown == total` always holds for a summary built by
/// [`Report::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
	pub total: usize,
	pub success: usize,
	pub failure: usize,
	pub unknown: usize,
	/// Number of functions that produced a result.
	pub coverage: usize,
	/// `coverage` as a share of the planned functions.
	pub coverage_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
	pub timestamp: DateTime<Local>,
	pub source: ReportSource,
	pub summary: ReportSummary,
	pub results: Vec<TestResult>,
}

impl Report {
	/// Builds a report from the results of a run that planned `planned` functions.
	pub fn build(source: ReportSource, planned: usize, results: Vec<TestResult>) -> Self {
		Self::build_at(Local::now(), source, planned, results)
	}

	pub fn build_at(timestamp: DateTime<Local>, source: ReportSource, planned: usize, results: Vec<TestResult>) -> Self {
		let count = |outcome: TestOutcome| results.iter().filter(|r| r.outcome == outcome).count();

		let coverage = results.len();
		let coverage_percentage = if planned > 0 {
			100.0 * coverage as f64 / planned as f64
		} else {
			0.0
		};

		let summary = ReportSummary {
			total: coverage,
			success: count(TestOutcome::Passed),
			failure: count(TestOutcome::Failed),
			unknown: count(TestOutcome::Unknown),
			coverage,
			coverage_percentage,
		};

		Self {
			timestamp,
			source,
			summary,
			results,
		}
	}

	/// Results that did not pass (failed or unknown).
	pub fn not_passed(&self) -> impl Iterator<Item = &TestResult> {
		self.results.iter().filter(|r| !r.outcome.is_passed())
	}

	pub fn all_passed(&self) -> bool {
		self.summary.success == self.summary.total
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_results() -> Vec<TestResult> {
		vec![
			TestResult::passed("testSheetFunctions"),
			TestResult::failed("testEditHandler", "run button not found"),
			TestResult::unknown("testAll", "result undetermined"),
			TestResult::passed("testInvalidInputs"),
		]
	}

	#[test]
	fn summary_counts_add_up_to_total() {
		let report = Report::build(ReportSource::Editor, 4, sample_results());
		let s = &report.summary;

		assert_eq!(s.total, 4);
		assert_eq!(s.success, 2);
		assert_eq!(s.failure, 1);
		assert_eq!(s.unknown, 1);
		assert_eq!(s.success + s.failure + s.unknown, s.total);
		assert!(!report.all_passed());
	}

	#[test]
	fn coverage_relative_to_planned() {
		let report = Report::build(ReportSource::Editor, 8, sample_results());
		assert_eq!(report.summary.coverage, 4);
		assert!((report.summary.coverage_percentage - 50.0).abs() < f64::EPSILON);
	}

	#[test]
	fn empty_plan_has_zero_coverage() {
		let report = Report::build(ReportSource::Api, 0, Vec::new());
		assert_eq!(report.summary.total, 0);
		assert_eq!(report.summary.coverage_percentage, 0.0);
		assert!(report.all_passed());
	}

	#[test]
	fn not_passed_includes_unknown() {
		let report = Report::build(ReportSource::Editor, 4, sample_results());
		let names: Vec<_> = report.not_passed().map(|r| r.test_function.as_str()).collect();
		assert_eq!(names, vec!["testEditHandler", "testAll"]);
	}

	#[test]
	fn serializes_camel_case_summary() {
		let report = Report::build(ReportSource::Api, 4, sample_results());
		let json = serde_json::to_value(&report).unwrap();
		assert_eq!(json["source"], "api");
		assert_eq!(json["summary"]["coveragePercentage"], 100.0);
		assert_eq!(json["results"].as_array().unwrap().len(), 4);
	}
}

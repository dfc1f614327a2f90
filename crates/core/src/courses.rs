//! Reads the course list sheet and drafts reservation rows for one cohort.
//!
//! Drafts are reported only; nothing is written back to the spreadsheet.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::browser::Session;
use crate::error::Result;
use crate::settings::CourseSettings;
use crate::sheets::sheet_url;

const SHEET_LOAD: Duration = Duration::from_secs(60);
const TABLE_WAIT: Duration = Duration::from_secs(15);

pub const OPEN_STATUS: &str = "予約受付中";

/// Largest `<table>` on the page: header cells from the first row, `td`
/// cells from the rest.
const READ_TABLE: &str = r#"() => {
	const tables = Array.from(document.querySelectorAll('table'));
	if (tables.length === 0) return null;
	const table = tables.reduce((a, b) => (b.querySelectorAll('tr').length > a.querySelectorAll('tr').length ? b : a));
	const trs = Array.from(table.querySelectorAll('tr'));
	if (trs.length === 0) return null;
	const text = (cell) => (cell.textContent || '').trim();
	const headers = Array.from(trs[0].querySelectorAll('th, td')).map(text);
	const rows = trs.slice(1).map((tr) => Array.from(tr.querySelectorAll('td')).map(text));
	return { headers, rows };
}"#;

const TABLE_ROWS: &str = r#"() => {
	const tables = Array.from(document.querySelectorAll('table'));
	if (tables.length === 0) return 1;
	return Math.max(...tables.map((t) => t.querySelectorAll('tr').length));
}"#;

const TABLE_PRESENT: &str = r#"() => document.querySelectorAll('table tr').length > 1"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTable {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

/// One course row keyed by header text.
pub type CourseRow = BTreeMap<String, String>;

/// Keys rows by header. Cells past the header row get `列N` (1-based) keys.
pub fn rows_to_records(table: &RawTable) -> Vec<CourseRow> {
	table
		.rows
		.iter()
		.map(|row| {
			row.iter()
				.enumerate()
				.map(|(i, value)| {
					let key = table
						.headers
						.get(i)
						.filter(|h| !h.is_empty())
						.cloned()
						.unwrap_or_else(|| format!("列{}", i + 1));
					(key, value.clone())
				})
				.collect()
		})
		.collect()
}

/// Keeps rows whose `期生` or `期` column equals `cohort`, or whose
/// `コース名` mentions it.
pub fn filter_cohort<'a>(rows: &'a [CourseRow], cohort: &str) -> Vec<&'a CourseRow> {
	rows.iter()
		.filter(|row| {
			row.get("期生").is_some_and(|v| v == cohort)
				|| row.get("期").is_some_and(|v| v == cohort)
				|| row.get("コース名").is_some_and(|v| v.contains(cohort))
		})
		.collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDraft {
	pub reservation_id: usize,
	pub course_id: String,
	pub name: String,
	pub guide: String,
	pub schedule: String,
	pub starts_at: String,
	pub ends_at: String,
	pub event_id: String,
	pub capacity: String,
	pub participants: String,
	pub status: String,
	pub target_group: String,
}

fn field(row: &CourseRow, key: &str) -> String {
	row.get(key).cloned().unwrap_or_default()
}

/// Drafts one reservation per course, numbering from `last_row`.
///
/// `last_row` is the reservation sheet's current row count including the
/// header, so the first draft continues right after the existing data.
pub fn draft_reservations(courses: &[&CourseRow], last_row: usize, cohort: &str) -> Vec<ReservationDraft> {
	courses
		.iter()
		.enumerate()
		.map(|(i, course)| {
			let guide = course
				.get("コース案内")
				.or_else(|| course.get("概要"))
				.cloned()
				.unwrap_or_default();
			ReservationDraft {
				reservation_id: last_row + i,
				course_id: field(course, "コースID"),
				name: field(course, "コース名"),
				guide,
				schedule: String::new(),
				starts_at: String::new(),
				ends_at: String::new(),
				event_id: String::new(),
				capacity: field(course, "最大参加者数"),
				participants: "0".into(),
				status: OPEN_STATUS.into(),
				target_group: cohort.into(),
			}
		})
		.collect()
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePlan {
	pub cohort: String,
	pub total_courses: usize,
	pub cohort_courses: usize,
	pub reservation_rows: usize,
	pub drafts: Vec<ReservationDraft>,
}

/// Reads the course list and the reservation sheet, then drafts reservations.
pub async fn plan_reservations(session: &Session, settings: &CourseSettings) -> Result<CoursePlan> {
	let course_url = sheet_url(&settings.spreadsheet_id, &settings.course_list_gid);
	info!(target = "gasprobe", url = %course_url, "reading course list");
	session.goto_lenient(&course_url, SHEET_LOAD).await?;
	if let Err(err) = session.wait_for("course table", TABLE_PRESENT, &(), TABLE_WAIT).await {
		warn!(target = "gasprobe", error = %err, "course table not detected");
	}

	let table: Option<RawTable> = session.eval(READ_TABLE, &()).await?;
	let records = table.as_ref().map(rows_to_records).unwrap_or_default();
	let cohort_rows = filter_cohort(&records, &settings.cohort);
	info!(
		target = "gasprobe",
		total = records.len(),
		cohort = %settings.cohort,
		matched = cohort_rows.len(),
		"course list read"
	);

	let reservation_url = sheet_url(&settings.spreadsheet_id, &settings.reservation_gid);
	session.goto_lenient(&reservation_url, SHEET_LOAD).await?;
	if let Err(err) = session.wait_for("reservation table", TABLE_PRESENT, &(), TABLE_WAIT).await {
		warn!(target = "gasprobe", error = %err, "reservation table not detected");
	}
	let reservation_rows: usize = session.eval(TABLE_ROWS, &()).await?;

	Ok(CoursePlan {
		cohort: settings.cohort.clone(),
		total_courses: records.len(),
		cohort_courses: cohort_rows.len(),
		reservation_rows,
		drafts: draft_reservations(&cohort_rows, reservation_rows, &settings.cohort),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table() -> RawTable {
		RawTable {
			headers: vec!["コースID".into(), "コース名".into(), "期生".into(), "最大参加者数".into(), "".into()],
			rows: vec![
				vec!["C001".into(), "契約書レビュー基礎".into(), "3期生".into(), "20".into(), "memo".into(), "extra".into()],
				vec!["C002".into(), "労務入門".into(), "2期生".into(), "15".into()],
				vec!["C003".into(), "3期生向け 知財".into(), "".into(), "10".into()],
			],
		}
	}

	#[test]
	fn missing_headers_fall_back_to_column_numbers() {
		let records = rows_to_records(&table());
		assert_eq!(records.len(), 3);
		assert_eq!(records[0]["列5"], "memo");
		assert_eq!(records[0]["列6"], "extra");
		assert_eq!(records[1]["コース名"], "労務入門");
	}

	#[test]
	fn cohort_filter_matches_column_or_course_name() {
		let records = rows_to_records(&table());
		let ids: Vec<_> = filter_cohort(&records, "3期生").iter().map(|r| r["コースID"].as_str()).collect();
		assert_eq!(ids, vec!["C001", "C003"]);
	}

	#[test]
	fn drafts_continue_numbering_and_fall_back_to_summary() {
		let mut with_guide = CourseRow::new();
		with_guide.insert("コースID".into(), "C010".into());
		with_guide.insert("コース名".into(), "英文契約".into());
		with_guide.insert("コース案内".into(), "案内文".into());
		with_guide.insert("概要".into(), "概要文".into());
		let mut summary_only = CourseRow::new();
		summary_only.insert("コースID".into(), "C011".into());
		summary_only.insert("概要".into(), "概要だけ".into());
		let mut blank_guide = CourseRow::new();
		blank_guide.insert("コースID".into(), "C012".into());
		blank_guide.insert("コース案内".into(), "".into());
		blank_guide.insert("概要".into(), "使われない".into());

		let drafts = draft_reservations(&[&with_guide, &summary_only, &blank_guide], 7, "3期生");
		assert_eq!(drafts[0].reservation_id, 7);
		assert_eq!(drafts[1].reservation_id, 8);
		assert_eq!(drafts[0].guide, "案内文");
		assert_eq!(drafts[1].guide, "概要だけ");
		assert_eq!(drafts[2].guide, "");
		assert_eq!(drafts[1].name, "");
		assert!(drafts.iter().all(|d| d.status == OPEN_STATUS && d.participants == "0" && d.target_group == "3期生"));
	}
}

//! Spreadsheet structure inspection through the web UI.
//!
//! Each step is best-effort: a failure is logged, recorded as a warning on the
//! [`SheetInspection`], and the next step runs anyway.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::Session;
use crate::error::Result;
use crate::settings::SpreadsheetTarget;

const SHEET_LOAD: Duration = Duration::from_secs(120);
const GRID_WAIT: Duration = Duration::from_secs(15);
const TABS_WAIT: Duration = Duration::from_secs(5);
const SWITCH_SETTLE: Duration = Duration::from_secs(3);

const HEADER_CELLS: usize = 15;
const SAMPLE_ROWS: usize = 3;
const SAMPLE_CELLS: usize = 12;

/// Tab-like labels that belong to the UI chrome, not to sheets.
const CHROME_LABELS: &[&str] = &["高度なオプション", "抽出", "更新と管理", "Advanced", "Extract", "Update"];

/// Sheet names likely to hold reservation data.
const DATA_SHEET_HINTS: &[&str] = &["予約一覧", "カレンダー", "予約", "スケジュール"];

/// Names never picked by the fallback choice.
const FALLBACK_EXCLUDES: &[&str] = &[
	"Keep",
	"ToDo",
	"コンタクト",
	"マップ",
	"Atlassian",
	"アドオン",
	"スプレッドシート",
	"シート",
	"AppSheet",
	"ホーム",
];

static MONTH_SHEET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2,4}年\d{1,2}月").expect("valid month pattern"));

const GRID_PRESENT: &str = r#"() => !!document.querySelector('[role="grid"], [role="tablist"]')"#;

const TABS_PRESENT: &str = r#"() => document.querySelectorAll('[role="tab"]').length > 0"#;

/// Raw tab labels. `labels` come from every tab-ish element, `tabs` only
/// from the sheet tab list.
const SHEET_NAMES: &str = r#"() => {
	const nameOf = (el) => el.getAttribute('data-sheet-name') || el.getAttribute('aria-label') || (el.textContent || '').trim();
	const labels = [];
	for (const sel of ['[role="tab"]', '[data-sheet-name]', '.docs-sheet-tab', '[aria-label*="シート"]', '[aria-label*="Sheet"]']) {
		document.querySelectorAll(sel).forEach((el) => labels.push(nameOf(el)));
	}
	const list = document.querySelector('[role="tablist"]');
	const tabs = list ? Array.from(list.querySelectorAll('[role="tab"]')).map(nameOf) : [];
	return { labels, tabs };
}"#;

const CLICK_SHEET: &str = r#"(target) => {
	for (const tab of document.querySelectorAll('[role="tab"]')) {
		const name = tab.getAttribute('data-sheet-name') || tab.getAttribute('aria-label') || (tab.textContent || '').trim();
		if (name && name.includes(target)) {
			tab.click();
			return true;
		}
	}
	return false;
}"#;

/// First grid row, up to `cells` non-empty cells.
const HEADER_ROW: &str = r#"(cells) => {
	const row = document.querySelector('[role="grid"] [role="row"]');
	if (!row) return [];
	return Array.from(row.querySelectorAll('[role="gridcell"]')).slice(0, cells).map((cell) => {
		const input = cell.querySelector('input');
		return input ? input.value : (cell.textContent || '').trim();
	}).filter(Boolean);
}"#;

const DATA_ROW_COUNT: &str = r#"() => {
	const grid = document.querySelector('[role="grid"]');
	if (!grid) return 0;
	return Math.max(0, grid.querySelectorAll('[role="row"]').length - 1);
}"#;

const SAMPLE_DATA: &str = r#"({ rows, cells }) => {
	const grid = document.querySelector('[role="grid"]');
	if (!grid) return [];
	return Array.from(grid.querySelectorAll('[role="row"]')).slice(1, 1 + rows).map((row) =>
		Array.from(row.querySelectorAll('[role="gridcell"]')).slice(0, cells).map((cell) => {
			const input = cell.querySelector('input');
			return input ? input.value : (cell.textContent || '').trim();
		}));
}"#;

#[derive(Debug, Default, Deserialize)]
struct RawSheetNames {
	#[serde(default)]
	labels: Vec<String>,
	#[serde(default)]
	tabs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInspection {
	pub name: String,
	pub url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub spreadsheet_id: Option<String>,
	/// False when navigation timed out and the page was read partially loaded.
	pub fully_loaded: bool,
	pub title: Option<String>,
	pub sheet_names: Vec<String>,
	pub target_sheet: Option<String>,
	pub headers: Vec<String>,
	pub data_rows: usize,
	pub samples: Vec<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screenshot: Option<PathBuf>,
	pub warnings: Vec<String>,
}

impl SheetInspection {
	fn warn(&mut self, message: impl Into<String>) {
		let message = message.into();
		warn!(target = "gasprobe", sheet = %self.name, "{message}");
		self.warnings.push(message);
	}
}

/// Extracts the document id from a `/spreadsheets/d/<id>/...` URL.
pub fn spreadsheet_id(sheet_url: &str) -> Option<String> {
	let parsed = url::Url::parse(sheet_url).ok()?;
	let mut segments = parsed.path_segments()?;
	segments.find(|s| *s == "d")?;
	segments.next().filter(|id| !id.is_empty()).map(String::from)
}

/// Edit URL opening the sheet with the given `gid`.
pub fn sheet_url(spreadsheet_id: &str, gid: &str) -> String {
	format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}/edit?gid={gid}#gid={gid}")
}

fn is_chrome_label(name: &str) -> bool {
	CHROME_LABELS.iter().any(|label| name.contains(label))
}

/// Merges raw labels into a de-duplicated list of sheet names, in page order.
fn merge_sheet_names(raw: RawSheetNames) -> Vec<String> {
	let mut names: Vec<String> = Vec::new();
	let labels = raw.labels.into_iter().filter(|n| !n.is_empty() && !is_chrome_label(n));
	let tabs = raw.tabs.into_iter().filter(|n| !n.is_empty() && n.chars().count() < 50);
	for name in labels.chain(tabs) {
		if !names.contains(&name) {
			names.push(name);
		}
	}
	names
}

/// Picks the sheet most likely to hold reservation data.
///
/// A name containing a data hint or shaped like a month (`2026年1月`) wins;
/// otherwise the first short name that is not an add-on or app entry.
pub fn choose_target_sheet(names: &[String]) -> Option<&str> {
	names
		.iter()
		.find(|name| DATA_SHEET_HINTS.iter().any(|hint| name.contains(hint)) || MONTH_SHEET.is_match(name))
		.or_else(|| {
			names.iter().find(|name| {
				!FALLBACK_EXCLUDES.iter().any(|ex| name.contains(ex)) && !name.is_empty() && name.chars().count() < 30
			})
		})
		.map(String::as_str)
}

/// Inspects one spreadsheet. Only a browser-level failure is an error.
pub async fn inspect(session: &Session, target: &SpreadsheetTarget, screenshot_dir: Option<&std::path::Path>) -> Result<SheetInspection> {
	let mut report = SheetInspection {
		name: target.name.clone(),
		url: target.url.clone(),
		spreadsheet_id: spreadsheet_id(&target.url),
		..Default::default()
	};
	info!(target = "gasprobe", sheet = %target.name, url = %target.url, "inspecting spreadsheet");

	report.fully_loaded = match session.goto_lenient(&target.url, SHEET_LOAD).await {
		Ok(loaded) => loaded,
		Err(err) => {
			report.warn(format!("navigation failed: {err}"));
			false
		}
	};
	if let Err(err) = session.wait_for("spreadsheet grid", GRID_PRESENT, &(), GRID_WAIT).await {
		report.warn(format!("grid not detected: {err}"));
	}

	match session.title().await {
		Ok(title) => report.title = Some(title),
		Err(err) => report.warn(format!("title unavailable: {err}")),
	}

	if let Err(err) = session.wait_for("sheet tabs", TABS_PRESENT, &(), TABS_WAIT).await {
		report.warn(format!("sheet tabs not detected: {err}"));
	}
	match session.eval::<RawSheetNames, ()>(SHEET_NAMES, &()).await {
		Ok(raw) => report.sheet_names = merge_sheet_names(raw),
		Err(err) => report.warn(format!("sheet names unavailable: {err}")),
	}

	if report.sheet_names.is_empty() {
		report.warn("no sheet names found; skipping data sheet");
	} else {
		inspect_data_sheet(session, &mut report).await;
	}

	if let Some(dir) = screenshot_dir {
		let path = dir.join(format!("spreadsheet_{}.png", target.name.replace("期生", "")));
		match session.screenshot(&path, false).await {
			Ok(path) => report.screenshot = Some(path),
			Err(err) => report.warn(format!("screenshot failed: {err}")),
		}
	}

	Ok(report)
}

async fn inspect_data_sheet(session: &Session, report: &mut SheetInspection) {
	report.target_sheet = choose_target_sheet(&report.sheet_names).map(String::from);
	if let Some(sheet) = report.target_sheet.clone() {
		info!(target = "gasprobe", sheet = %sheet, "switching to data sheet");
		match session.eval::<bool, str>(CLICK_SHEET, sheet.as_str()).await {
			Ok(true) => sleep(SWITCH_SETTLE).await,
			Ok(false) => {
				report.warn(format!("could not click sheet tab {sheet}"));
				return;
			}
			Err(err) => {
				report.warn(format!("could not click sheet tab {sheet}: {err}"));
				return;
			}
		}
	}

	match session.eval::<Vec<String>, usize>(HEADER_ROW, &HEADER_CELLS).await {
		Ok(headers) if headers.is_empty() => report.warn("header row empty"),
		Ok(headers) => report.headers = headers,
		Err(err) => report.warn(format!("header row unavailable: {err}")),
	}

	match session.eval::<usize, ()>(DATA_ROW_COUNT, &()).await {
		Ok(count) => report.data_rows = count,
		Err(err) => report.warn(format!("row count unavailable: {err}")),
	}

	if report.data_rows > 0 {
		let arg = json!({ "rows": SAMPLE_ROWS, "cells": SAMPLE_CELLS });
		match session.eval::<Vec<Vec<String>>, _>(SAMPLE_DATA, &arg).await {
			Ok(rows) => report.samples = rows,
			Err(err) => report.warn(format!("sample rows unavailable: {err}")),
		}
	}
}

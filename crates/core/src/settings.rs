//! Run settings with defaults for the reservation workflow project.
//!
//! Every struct is `#[serde(default)]`, so a config file only needs the keys it
//! changes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCRIPT_ID: &str = "1DiZUSkJU_Z4Yc0bBcNgOUH3iqHux8xnSS7qILL5YZMfKgw86QeMvx0S-";
pub const SCRIPT_SCOPE: &str = "https://www.googleapis.com/auth/script.scriptapp";

const TEST_FUNCTIONS: &[&str] = &[
	"testSheetFunctions",
	"testCancelReservation",
	"testChangeReservation",
	"testMarkAttendeeAsReserved",
	"testMarkAttendeeAsUnreserved",
	"testAllSheetFunctions",
	"testRefreshAttendeeStatus",
	"testHandleReservationFormSubmit",
	"testOnCreatingSchedule",
	"testOnDashboardAction",
	"testEditHandler",
	"testAllUntestedFunctions",
	"testAll",
	"testEnhancedFunctions",
	"testCalendarEnhancedFunctions",
	"testReservationChangeFunctions",
	"testEventCapacityBoundary",
	"testChangeDeadlineBoundary",
	"testChangeLimitBoundary",
	"testInvalidInputs",
	"testDataInconsistency",
	"testErrorHandling",
	"testAllBoundaryAndEdgeCases",
	"testRebuildDependencies",
	"testGetReservedCountForGroupAndCourse",
	"testGetCourseNumberFromCourseListByCourseName",
	"testUpdateDashboardAfterReservation",
	"testDeleteCalendarEvent",
	"testSyncCalendarOnReservationChange",
	"testSendReservationConfirmationEmail",
	"testSendReservationChangeEmail",
	"testSendCancellationEmail",
	"testAllNewFunctions",
];

const FAILED_FUNCTIONS: &[&str] = &[
	"testErrorHandling",
	"testAllBoundaryAndEdgeCases",
	"testRebuildDependencies",
	"testUpdateDashboardAfterReservation",
];

const LONG_RUNNING: &[&str] = &["testRebuildDependencies", "testUpdateDashboardAfterReservation", "testAll"];

const EXPECTED_ERRORS: &[&str] = &[
	"testInvalidInputs",
	"testErrorHandling",
	"testDataInconsistency",
	"testAllBoundaryAndEdgeCases",
];

const WATCHED: &[&str] = &[
	"testRefreshAttendeeStatus",
	"testHandleReservationFormSubmit",
	"testOnCreatingSchedule",
	"testOnDashboardAction",
	"testEditHandler",
	"testEnhancedFunctions",
	"testCalendarEnhancedFunctions",
	"testReservationChangeFunctions",
	"testChangeReservation",
];

fn strings(list: &[&str]) -> Vec<String> {
	list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
	pub browser: BrowserSettings,
	pub editor: EditorSettings,
	pub tests: TestSettings,
	pub logs_dir: Option<PathBuf>,
	pub spreadsheets: Spreadsheets,
	pub courses: CourseSettings,
	pub api: ApiSettings,
}

impl Settings {
	pub fn logs_dir(&self) -> PathBuf {
		self.logs_dir.clone().unwrap_or_else(|| PathBuf::from("logs"))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserSettings {
	/// Persistent profile directory; `~/.gasprobe/chrome-profile` when unset.
	pub profile_dir: Option<PathBuf>,
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub width: u32,
	pub height: u32,
}

impl Default for BrowserSettings {
	fn default() -> Self {
		Self {
			profile_dir: None,
			executable: None,
			headless: false,
			width: 1920,
			height: 1080,
		}
	}
}

impl BrowserSettings {
	pub fn profile_dir(&self) -> PathBuf {
		self.profile_dir.clone().unwrap_or_else(|| {
			dirs::home_dir()
				.unwrap_or_else(|| PathBuf::from("."))
				.join(".gasprobe")
				.join("chrome-profile")
		})
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorSettings {
	pub project_url: String,
	/// Script file tab holding the test functions.
	pub script_file: String,
	pub long_running: Vec<String>,
	pub wait_secs: u64,
	pub long_wait_secs: u64,
}

impl Default for EditorSettings {
	fn default() -> Self {
		Self {
			project_url: format!("https://script.google.com/u/0/home/projects/{DEFAULT_SCRIPT_ID}/edit"),
			script_file: "tests.gs".into(),
			long_running: strings(LONG_RUNNING),
			wait_secs: 30,
			long_wait_secs: 90,
		}
	}
}

impl EditorSettings {
	/// Completion budget for `function`.
	pub fn budget(&self, function: &str) -> Duration {
		if self.long_running.iter().any(|f| f == function) {
			Duration::from_secs(self.long_wait_secs)
		} else {
			Duration::from_secs(self.wait_secs)
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestSettings {
	pub functions: Vec<String>,
	/// Default selection for `rerun`.
	pub failed: Vec<String>,
	pub expected_errors: Vec<String>,
	/// Functions summarised by `check-logs`.
	pub watched: Vec<String>,
	pub default_function: String,
	pub prepare_function: String,
	pub pause_secs: u64,
	pub rerun_pause_secs: u64,
}

impl Default for TestSettings {
	fn default() -> Self {
		Self {
			functions: strings(TEST_FUNCTIONS),
			failed: strings(FAILED_FUNCTIONS),
			expected_errors: strings(EXPECTED_ERRORS),
			watched: strings(WATCHED),
			default_function: "testAllNewFunctions".into(),
			prepare_function: "createTestEvent".into(),
			pause_secs: 10,
			rerun_pause_secs: 15,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetTarget {
	pub name: String,
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spreadsheets(pub Vec<SpreadsheetTarget>);

impl Default for Spreadsheets {
	fn default() -> Self {
		let sheet = |name: &str, id: &str, gid: &str| SpreadsheetTarget {
			name: name.into(),
			url: format!("https://docs.google.com/spreadsheets/d/{id}/edit?gid={gid}#gid={gid}"),
		};
		Self(vec![
			sheet("1期生", "1IaunHch_ugiEIw91AaDEHEHKNaP0RDHm5ZFN_gTU5Fs", "115666812"),
			sheet("2期生", "1tyn9AelB-MTEd1ywVvMMr4H7hKQ1wjoIVUDLkZl_iBg", "2079770910"),
			sheet("3期生", "1fWvxFEULuq7Va2YxSoy6LGCFp7Rfk0sn7yGuVxhQclI", "1024145159"),
		])
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CourseSettings {
	pub spreadsheet_id: String,
	pub course_list_gid: String,
	pub reservation_gid: String,
	pub cohort: String,
}

impl Default for CourseSettings {
	fn default() -> Self {
		Self {
			spreadsheet_id: "1ln9GGhT7wbhhsWPIeATGkAnfAkXFvH8CfUeuZqmgqpE".into(),
			course_list_gid: "1504366156".into(),
			reservation_gid: "0".into(),
			cohort: "3期生".into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiSettings {
	pub script_id: String,
	pub credentials: PathBuf,
	pub token: PathBuf,
	pub scopes: Vec<String>,
	/// Run the latest saved code instead of the deployed version.
	pub dev_mode: bool,
}

impl Default for ApiSettings {
	fn default() -> Self {
		Self {
			script_id: DEFAULT_SCRIPT_ID.into(),
			credentials: PathBuf::from("credentials.json"),
			token: PathBuf::from("token.json"),
			scopes: vec![SCRIPT_SCOPE.to_string()],
			dev_mode: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_cover_the_full_suite() {
		let settings = Settings::default();
		assert_eq!(settings.tests.functions.len(), 33);
		assert!(settings.tests.failed.iter().all(|f| settings.tests.functions.contains(f)));
		assert_eq!(settings.spreadsheets.0.len(), 3);
		assert!(settings.editor.project_url.contains(&settings.api.script_id));
	}

	#[test]
	fn long_running_functions_get_longer_budget() {
		let editor = EditorSettings::default();
		assert_eq!(editor.budget("testRebuildDependencies"), Duration::from_secs(90));
		assert_eq!(editor.budget("testSheetFunctions"), Duration::from_secs(30));
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let settings: Settings =
			serde_json::from_str(r#"{"tests":{"pauseSecs":0},"browser":{"headless":true}}"#).unwrap();
		assert_eq!(settings.tests.pause_secs, 0);
		assert!(settings.browser.headless);
		assert_eq!(settings.browser.width, 1920);
		assert_eq!(settings.tests.default_function, "testAllNewFunctions");
	}
}

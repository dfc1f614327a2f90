//! Script-editor flow: open the project, pick a function, run it and read
//! back the execution log.

mod scripts;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use gasprobe_protocol::{ReportSource, TestResult};
use serde::Serialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{Locator, Session};
use crate::classify::{self, FunctionMention, LOADING_MARKER};
use crate::error::Result;
use crate::logstore::LogStore;
use crate::settings::Settings;
use crate::suite::FunctionRunner;

const EDITOR_LOAD: Duration = Duration::from_secs(60);
const EDITOR_READY_WAIT: Duration = Duration::from_secs(30);
const FILE_TAB_WAIT: Duration = Duration::from_secs(5);
const DROPDOWN_WAIT: Duration = Duration::from_secs(5);
const OPTION_WAIT: Duration = Duration::from_secs(2);
const RUN_BUTTON_WAIT: Duration = Duration::from_secs(3);
const LOG_BUTTON_WAIT: Duration = Duration::from_secs(5);
const LOG_REOPEN_WAIT: Duration = Duration::from_secs(3);
const FIRST_LOG_WAIT: Duration = Duration::from_secs(10);
const LATER_LOG_WAIT: Duration = Duration::from_secs(15);
const PREPARE_WAIT: Duration = Duration::from_secs(15);

/// Short pause after clicks that have nothing observable to wait on.
const SETTLE: Duration = Duration::from_secs(2);

const LOG_ATTEMPTS: usize = 5;

/// Scraped text longer than this counts as a usable log even without markers.
const MIN_SETTLED_LOG_CHARS: usize = 200;

const COMPLETION_KEYWORDS: &[&str] = &["完了", "✅", "❌"];

const FUNCTION_DROPDOWNS: &[&str] = &[
	r#"div[aria-label="実行する関数を選択"]"#,
	r#"div[aria-label*="関数を選択"]"#,
	r#"[role="combobox"][aria-label*="関数"]"#,
	r#"[role="combobox"][aria-label*="function"]"#,
];

fn run_buttons() -> Vec<Locator> {
	vec![
		Locator::css(r#"button[aria-label="選択した関数を実行"]"#),
		Locator::css(r#"button[aria-label*="実行"]:not([aria-label*="ログ"])"#),
		Locator::css(r#"button[aria-label*="Run"]"#),
		Locator::text("button", "実行"),
		Locator::text("button", "Run"),
	]
}

fn log_buttons() -> Vec<Locator> {
	vec![
		Locator::css(r#"button[aria-label*="実行ログ"]"#),
		Locator::css(r#"button[aria-label*="Execution log"]"#),
		Locator::text("button", "実行ログ"),
		Locator::text("button", "Execution log"),
		Locator::css(r#"[role="button"][aria-label*="ログ"]"#),
	]
}

fn file_tabs(name: &str) -> Vec<Locator> {
	vec![
		Locator::css(format!(r#"[aria-label*="{name}"]"#)),
		Locator::text(r#"[role="tab"], [role="treeitem"], button"#, name),
		Locator::text("div, span", name),
	]
}

/// Result of a prepare-only run: the function was started, nothing scraped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareOutcome {
	pub function: String,
	pub started: bool,
	pub completion_seen: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screenshot: Option<PathBuf>,
}

/// Snapshot of the execution log as currently shown in the editor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCheck {
	pub text: String,
	pub mentions: Vec<FunctionMention>,
	pub error_lines: Vec<String>,
}

enum Launch {
	Started,
	/// Could not start the function; the result says why.
	Aborted(TestResult),
}

/// Runs test functions by driving the editor UI.
pub struct EditorRunner<'a> {
	session: &'a Session,
	settings: &'a Settings,
	store: LogStore,
}

impl<'a> EditorRunner<'a> {
	pub fn new(session: &'a Session, settings: &'a Settings, store: LogStore) -> Self {
		Self { session, settings, store }
	}

	pub async fn open_editor(&self) -> Result<()> {
		let url = &self.settings.editor.project_url;
		info!(target = "gasprobe", url = %url, "opening script editor");
		self.session.goto(url, EDITOR_LOAD).await?;
		if let Err(err) = self
			.session
			.wait_for("editor ready", scripts::EDITOR_READY, &(), EDITOR_READY_WAIT)
			.await
		{
			warn!(target = "gasprobe", error = %err, "editor toolbar not detected, continuing");
		}
		Ok(())
	}

	async fn open_script_file(&self) {
		let name = &self.settings.editor.script_file;
		match self.session.click_first(&file_tabs(name), FILE_TAB_WAIT).await {
			Ok(_) => {
				info!(target = "gasprobe", file = %name, "opened script file");
				sleep(SETTLE).await;
			}
			Err(_) => warn!(target = "gasprobe", file = %name, "script file tab not found, assuming it is open"),
		}
	}

	async fn eval_flag<A: Serialize + ?Sized>(&self, script: &str, arg: &A) -> bool {
		match self.session.eval::<bool, A>(script, arg).await {
			Ok(flag) => flag,
			Err(err) => {
				debug!(target = "gasprobe", error = %err, "selection script failed");
				false
			}
		}
	}

	/// Tries each selection strategy in turn; returns the one that worked.
	async fn select_function(&self, name: &str) -> Option<&'static str> {
		if self.eval_flag(scripts::SELECT_OPTION, &json!({ "name": name, "exact": true })).await {
			return Some("select");
		}

		for selector in FUNCTION_DROPDOWNS {
			if self
				.session
				.wait_for_locator(&Locator::css(*selector), DROPDOWN_WAIT)
				.await
				.is_err()
			{
				continue;
			}
			match self.session.type_and_submit(selector, name).await {
				Ok(()) => return Some("function-dropdown"),
				Err(err) => debug!(target = "gasprobe", selector, error = %err, "dropdown typing failed"),
			}
		}

		let count: usize = self.session.eval(scripts::COUNT_DROPDOWNS, &()).await.unwrap_or(0);
		for idx in 0..count {
			if !self.eval_flag(scripts::OPEN_DROPDOWN, &idx).await {
				continue;
			}
			// CLICK_OPTION clicks as soon as the option renders.
			if self
				.session
				.wait_for("function option", scripts::CLICK_OPTION, name, OPTION_WAIT)
				.await
				.is_ok()
			{
				return Some("combobox");
			}
			self.eval_flag(scripts::CLOSE_DROPDOWN, &()).await;
		}

		if self.eval_flag(scripts::SELECT_OPTION, &json!({ "name": name, "exact": false })).await {
			return Some("script");
		}
		None
	}

	/// Opens the editor, selects `function` and clicks run.
	async fn launch(&self, function: &str, keyboard_fallback: bool) -> Result<Launch> {
		self.open_editor().await?;
		self.open_script_file().await;

		let Some(strategy) = self.select_function(function).await else {
			warn!(target = "gasprobe", function, "function selection failed");
			let path = self.store.screenshot_path("function_select_failed", function);
			let screenshot = self.session.try_screenshot(&path).await;
			return Ok(Launch::Aborted(
				TestResult::failed(function, "function selection failed").with_screenshot(screenshot),
			));
		};
		info!(target = "gasprobe", function, strategy, "function selected");
		sleep(SETTLE).await;

		match self.session.eval::<Option<String>, ()>(scripts::SELECTED_FUNCTION, &()).await {
			Ok(Some(selected)) => debug!(target = "gasprobe", selected = %selected, "selection confirmed"),
			_ => debug!(target = "gasprobe", "selection could not be confirmed"),
		}

		match self.session.click_first(&run_buttons(), RUN_BUTTON_WAIT).await {
			Ok(_) => info!(target = "gasprobe", function, "run clicked"),
			Err(_) if keyboard_fallback => {
				info!(target = "gasprobe", function, "run button not found, using Ctrl+Enter");
				self.session.press_ctrl_enter().await?;
			}
			Err(_) => {
				warn!(target = "gasprobe", function, "run button not found");
				return Ok(Launch::Aborted(TestResult::failed(function, "run button not found")));
			}
		}
		sleep(SETTLE).await;
		Ok(Launch::Started)
	}

	/// Polls until the log shows a completion keyword; `false` when the budget
	/// ran out first.
	async fn wait_for_completion(&self, budget: Duration) -> bool {
		let arg = json!({ "markers": COMPLETION_KEYWORDS, "loading": LOADING_MARKER });
		let predicate = scripts::log_settled_predicate();
		match self.session.wait_for("completion marker", &predicate, &arg, budget).await {
			Ok(()) => true,
			Err(err) => {
				info!(target = "gasprobe", error = %err, "no completion marker yet");
				false
			}
		}
	}

	async fn open_log_panel(&self, per_candidate: Duration) -> bool {
		self.session.click_first(&log_buttons(), per_candidate).await.is_ok()
	}

	/// Reads the log text, reopening the panel while it is still loading.
	async fn scrape_log(&self) -> String {
		let predicate = scripts::log_settled_predicate();
		let arg = json!({ "markers": COMPLETION_KEYWORDS, "loading": LOADING_MARKER });
		let mut content = String::new();

		for attempt in 0..LOG_ATTEMPTS {
			let limit = if attempt == 0 { FIRST_LOG_WAIT } else { LATER_LOG_WAIT };
			let _ = self.session.wait_for("log content", &predicate, &arg, limit).await;
			content = self
				.session
				.eval::<String, ()>(scripts::EXTRACT_LOG, &())
				.await
				.unwrap_or_default();

			let last = attempt + 1 == LOG_ATTEMPTS;
			if content.contains(LOADING_MARKER) {
				debug!(target = "gasprobe", attempt = attempt + 1, "log still loading");
				if !last {
					self.open_log_panel(LOG_REOPEN_WAIT).await;
				}
				continue;
			}

			if log_is_settled(&content) {
				info!(target = "gasprobe", chars = content.chars().count(), "execution log retrieved");
				break;
			}
			debug!(target = "gasprobe", attempt = attempt + 1, "execution log not found yet");
			if !last {
				self.open_log_panel(LOG_REOPEN_WAIT).await;
			}
		}

		content
	}

	/// Starts `function` and waits briefly, without reading results.
	pub async fn prepare(&self, function: &str) -> Result<PrepareOutcome> {
		match self.launch(function, true).await? {
			Launch::Aborted(result) => Ok(PrepareOutcome {
				function: function.to_string(),
				started: false,
				completion_seen: false,
				error: result.error,
				screenshot: result.screenshot,
			}),
			Launch::Started => Ok(PrepareOutcome {
				function: function.to_string(),
				started: true,
				completion_seen: self.wait_for_completion(PREPARE_WAIT).await,
				error: None,
				screenshot: None,
			}),
		}
	}

	/// Reads the execution log as the editor currently shows it.
	pub async fn check_logs(&self) -> Result<LogCheck> {
		self.open_editor().await?;
		if !self.open_log_panel(RUN_BUTTON_WAIT).await {
			warn!(target = "gasprobe", "execution log button not found");
		}
		let arg = json!({ "markers": COMPLETION_KEYWORDS, "loading": LOADING_MARKER });
		let _ = self
			.session
			.wait_for("log content", &scripts::log_settled_predicate(), &arg, FIRST_LOG_WAIT)
			.await;

		let text: String = self.session.eval(scripts::EXTRACT_LOG, &()).await?;
		Ok(LogCheck {
			mentions: classify::mentions(&text, &self.settings.tests.watched),
			error_lines: classify::error_lines(&text),
			text,
		})
	}
}

/// Long enough, or showing a completion keyword.
fn log_is_settled(content: &str) -> bool {
	let trimmed = content.trim();
	!trimmed.is_empty()
		&& (trimmed.chars().count() > MIN_SETTLED_LOG_CHARS || COMPLETION_KEYWORDS.iter().any(|k| content.contains(k)))
}

#[async_trait]
impl FunctionRunner for EditorRunner<'_> {
	fn source(&self) -> ReportSource {
		ReportSource::Editor
	}

	async fn run(&mut self, function: &str) -> Result<TestResult> {
		if let Launch::Aborted(result) = self.launch(function, false).await? {
			return Ok(result);
		}

		let budget = self.settings.editor.budget(function);
		info!(target = "gasprobe", function, budget_secs = budget.as_secs(), "waiting for completion");
		self.wait_for_completion(budget).await;

		if !self.open_log_panel(LOG_BUTTON_WAIT).await {
			warn!(target = "gasprobe", "execution log button not found");
		}

		let content = self.scrape_log().await;
		if content.trim().is_empty() {
			warn!(target = "gasprobe", function, "execution log not retrieved");
			return Ok(TestResult::unknown(function, "log not retrieved"));
		}

		let path = self.store.save(function, &content)?;
		let tests = &self.settings.tests;
		let classification = classify::classify(&content, &tests.functions, &tests.expected_errors);
		Ok(classification.into_result(function).with_log_file(path))
	}
}

//! Chromium session over the DevTools protocol.
//!
//! A [`Session`] owns one browser process launched on a persistent profile and
//! the page the flows drive. All waiting goes through [`Session::wait_for`],
//! which polls a JavaScript predicate until it turns truthy or a deadline
//! passes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::settings::BrowserSettings;

/// Default interval between predicate polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// CDP modifier bit for Control.
const CTRL_MODIFIER: i64 = 2;

/// Binaries probed on `PATH` when no executable is configured.
const CHROME_CANDIDATES: &[&str] = &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser", "chrome"];

#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub profile_dir: PathBuf,
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub width: u32,
	pub height: u32,
}

impl From<&BrowserSettings> for LaunchOptions {
	fn from(settings: &BrowserSettings) -> Self {
		Self {
			profile_dir: settings.profile_dir(),
			executable: settings.executable.clone(),
			headless: settings.headless,
			width: settings.width,
			height: settings.height,
		}
	}
}

/// Finds a Chrome/Chromium binary on `PATH`.
pub fn detect_executable() -> Option<PathBuf> {
	CHROME_CANDIDATES.iter().find_map(|name| which::which(name).ok())
}

/// Something to click: a CSS selector, or an element of `tag` whose text
/// contains `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Locator {
	Css { selector: String },
	Text { tag: String, text: String },
}

impl Locator {
	pub fn css(selector: impl Into<String>) -> Self {
		Locator::Css {
			selector: selector.into(),
		}
	}

	pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
		Locator::Text {
			tag: tag.into(),
			text: text.into(),
		}
	}
}

impl std::fmt::Display for Locator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Locator::Css { selector } => f.write_str(selector),
			Locator::Text { tag, text } => write!(f, "{tag}:has-text(\"{text}\")"),
		}
	}
}

/// Resolves a [`Locator`] to a visible element; clicks it when `click` is set.
const LOCATE_JS: &str = r#"({ locator, click }) => {
	const visible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
	let el = null;
	if (locator.kind === 'css') {
		el = Array.from(document.querySelectorAll(locator.selector)).find(visible) || null;
	} else {
		const matches = Array.from(document.querySelectorAll(locator.tag))
			.filter((node) => visible(node) && (node.textContent || '').includes(locator.text));
		// innermost match: the shortest text
		matches.sort((a, b) => a.textContent.length - b.textContent.length);
		el = matches[0] || null;
	}
	if (!el) return false;
	if (click) {
		el.scrollIntoView({ block: 'center' });
		el.click();
	}
	return true;
}"#;

pub struct Session {
	browser: Browser,
	page: Page,
	handler: JoinHandle<()>,
}

impl Session {
	/// Launches Chromium on the persistent profile and picks the working page.
	pub async fn launch(opts: &LaunchOptions) -> Result<Self> {
		std::fs::create_dir_all(&opts.profile_dir)?;

		let mut builder = BrowserConfig::builder()
			.user_data_dir(&opts.profile_dir)
			.window_size(opts.width, opts.height)
			.viewport(None)
			.arg("--disable-blink-features=AutomationControlled");
		if !opts.headless {
			builder = builder.with_head();
		}
		if let Some(path) = opts.executable.clone().or_else(detect_executable) {
			debug!(target = "gasprobe", executable = %path.display(), "using browser executable");
			builder = builder.chrome_executable(path);
		}
		let config = builder.build().map_err(Error::BrowserLaunch)?;

		info!(target = "gasprobe", profile = %opts.profile_dir.display(), headless = opts.headless, "launching browser");
		let (browser, mut handler) = Browser::launch(config)
			.await
			.map_err(|e| Error::BrowserLaunch(e.to_string()))?;

		let handler = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if let Err(err) = event {
					debug!(target = "gasprobe", error = %err, "cdp handler event error");
				}
			}
		});

		let page = match browser.pages().await?.into_iter().next() {
			Some(page) => page,
			None => browser.new_page("about:blank").await?,
		};

		Ok(Self { browser, page, handler })
	}

	/// Navigates with a deadline. A timeout surfaces as [`Error::Navigation`].
	pub async fn goto(&self, url: &str, limit: Duration) -> Result<()> {
		debug!(target = "gasprobe", url, timeout_ms = limit.as_millis() as u64, "goto");
		match timeout(limit, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(Error::Navigation {
				url: url.to_string(),
				message: err.to_string(),
			}),
			Err(_) => Err(Error::Navigation {
				url: url.to_string(),
				message: format!("timed out after {}ms", limit.as_millis()),
			}),
		}
	}

	/// Like [`goto`](Self::goto), but a timeout only logs a warning and the
	/// caller continues on the partially loaded page. Returns `false` on timeout.
	pub async fn goto_lenient(&self, url: &str, limit: Duration) -> Result<bool> {
		match self.goto(url, limit).await {
			Ok(()) => Ok(true),
			Err(Error::Navigation { message, .. }) if message.starts_with("timed out") => {
				warn!(target = "gasprobe", url, "navigation timed out, continuing on partial page");
				Ok(false)
			}
			Err(err) => Err(err),
		}
	}

	/// Calls the JavaScript function `script` with `arg` serialized as JSON.
	pub async fn eval<T, A>(&self, script: &str, arg: &A) -> Result<T>
	where
		T: DeserializeOwned,
		A: Serialize + ?Sized,
	{
		let expression = format!("({})({})", script, serde_json::to_string(arg)?);
		self.eval_expr(&expression).await
	}

	/// Evaluates a bare expression.
	pub async fn eval_expr<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
		let value = self
			.page
			.evaluate(expression)
			.await
			.map_err(|e| Error::JsEval(e.to_string()))?;
		value.into_value::<T>().map_err(|e| Error::JsEval(e.to_string()))
	}

	/// Polls `predicate(arg)` until it returns a truthy value.
	///
	/// Evaluation errors count as "not yet"; the page may be mid-navigation.
	pub async fn wait_for<A>(&self, condition: &str, predicate: &str, arg: &A, limit: Duration) -> Result<()>
	where
		A: Serialize + ?Sized,
	{
		let deadline = Instant::now() + limit;
		loop {
			match self.eval::<serde_json::Value, A>(predicate, arg).await {
				Ok(value) if truthy(&value) => return Ok(()),
				Ok(_) => {}
				Err(err) => debug!(target = "gasprobe", condition, error = %err, "wait predicate failed"),
			}
			if Instant::now() >= deadline {
				return Err(Error::Timeout {
					ms: limit.as_millis() as u64,
					condition: condition.to_string(),
				});
			}
			sleep(POLL_INTERVAL).await;
		}
	}

	pub async fn wait_for_locator(&self, locator: &Locator, limit: Duration) -> Result<()> {
		let arg = serde_json::json!({ "locator": locator, "click": false });
		self.wait_for(&locator.to_string(), LOCATE_JS, &arg, limit).await
	}

	/// Clicks `locator` once it appears.
	///
	/// CSS locators go through a real input-level click; text locators are
	/// clicked from script since CSS cannot match on text.
	pub async fn click(&self, locator: &Locator, limit: Duration) -> Result<()> {
		self.wait_for_locator(locator, limit).await?;
		match locator {
			Locator::Css { selector } => {
				let element = self.page.find_element(selector.as_str()).await.map_err(|_| Error::ElementNotFound {
					selector: selector.clone(),
				})?;
				element.click().await?;
			}
			Locator::Text { .. } => {
				let clicked: bool = self
					.eval(LOCATE_JS, &serde_json::json!({ "locator": locator, "click": true }))
					.await?;
				if !clicked {
					return Err(Error::ElementNotFound {
						selector: locator.to_string(),
					});
				}
			}
		}
		Ok(())
	}

	/// Tries `candidates` in order, giving each up to `per_candidate` to
	/// appear. Returns the index of the one clicked.
	pub async fn click_first(&self, candidates: &[Locator], per_candidate: Duration) -> Result<usize> {
		for (idx, locator) in candidates.iter().enumerate() {
			match self.click(locator, per_candidate).await {
				Ok(()) => {
					debug!(target = "gasprobe", locator = %locator, "clicked");
					return Ok(idx);
				}
				Err(err) => debug!(target = "gasprobe", locator = %locator, error = %err, "candidate not clickable"),
			}
		}
		Err(Error::ElementNotFound {
			selector: candidates.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | "),
		})
	}

	/// Clicks the element matching `selector`, types `text` and presses Enter.
	pub async fn type_and_submit(&self, selector: &str, text: &str) -> Result<()> {
		let element = self.page.find_element(selector).await.map_err(|_| Error::ElementNotFound {
			selector: selector.to_string(),
		})?;
		element.click().await?;
		sleep(Duration::from_millis(500)).await;
		element.type_str(text).await?;
		sleep(Duration::from_millis(500)).await;
		element.press_key("Enter").await?;
		Ok(())
	}

	/// Sends Ctrl+Enter to the focused element.
	pub async fn press_ctrl_enter(&self) -> Result<()> {
		for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
			let params = DispatchKeyEventParams::builder()
				.r#type(kind)
				.key("Enter")
				.code("Enter")
				.modifiers(CTRL_MODIFIER)
				.windows_virtual_key_code(13)
				.build()
				.map_err(Error::Input)?;
			self.page.execute(params).await?;
		}
		Ok(())
	}

	pub async fn title(&self) -> Result<String> {
		Ok(self.page.get_title().await?.unwrap_or_default())
	}

	pub async fn url(&self) -> Result<String> {
		Ok(self.page.url().await?.unwrap_or_default())
	}

	/// Saves a PNG screenshot to `path`, creating parent directories.
	pub async fn screenshot(&self, path: &Path, full_page: bool) -> Result<PathBuf> {
		let params = ScreenshotParams::builder()
			.format(CaptureScreenshotFormat::Png)
			.full_page(full_page)
			.build();
		let bytes = self.page.screenshot(params).await.map_err(|e| Error::Screenshot {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;

		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, bytes).await.map_err(|e| Error::Screenshot {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
		Ok(path.to_path_buf())
	}

	/// Screenshot for diagnostics: failures are logged, never returned.
	pub async fn try_screenshot(&self, path: &Path) -> Option<PathBuf> {
		match self.screenshot(path, true).await {
			Ok(path) => {
				info!(target = "gasprobe", path = %path.display(), "saved screenshot");
				Some(path)
			}
			Err(err) => {
				warn!(target = "gasprobe", error = %err, "screenshot failed");
				None
			}
		}
	}

	pub async fn close(mut self) -> Result<()> {
		debug!(target = "gasprobe", "closing browser");
		self.browser.close().await?;
		let _ = self.browser.wait().await;
		self.handler.abort();
		Ok(())
	}
}

/// JavaScript truthiness for a decoded value.
pub(crate) fn truthy(value: &serde_json::Value) -> bool {
	use serde_json::Value;
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

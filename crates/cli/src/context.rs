//! Per-invocation state shared by every command.

use std::path::PathBuf;

use gasprobe::{LaunchOptions, LogStore, Session, Settings};
use tracing::warn;

use crate::cli::Cli;
use crate::config::{self, ConfigPaths};
use crate::error::Result;
use crate::output::{EffectiveConfig, OutputFormat};

pub struct CommandContext {
	pub settings: Settings,
	pub sources: Vec<PathBuf>,
	pub format: OutputFormat,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let loaded = config::load(&ConfigPaths::discover(cli.config.clone()), &cli.overrides())?;
		Ok(Self {
			settings: loaded.settings,
			sources: loaded.sources,
			format: cli.format,
		})
	}

	pub fn store(&self) -> LogStore {
		LogStore::new(self.settings.logs_dir())
	}

	pub fn effective_config(&self) -> EffectiveConfig {
		EffectiveConfig {
			headless: self.settings.browser.headless,
			profile_dir: self.settings.browser.profile_dir(),
			logs_dir: self.settings.logs_dir(),
			sources: self.sources.clone(),
		}
	}

	pub async fn launch(&self) -> Result<Session> {
		Ok(Session::launch(&LaunchOptions::from(&self.settings.browser)).await?)
	}
}

/// Closes the browser; a failure here never masks the command's own result.
pub async fn close_session(session: Session) {
	if let Err(err) = session.close().await {
		warn!(target = "gasprobe", error = %err, "browser did not close cleanly");
	}
}

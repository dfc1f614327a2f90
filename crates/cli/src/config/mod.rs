//! Layered settings: global file, project file, then command-line overrides.
//!
//! Files are plain JSON in the shape of [`Settings`]. Objects merge key by key,
//! so a project file only needs the keys it changes; any other value (arrays
//! included) replaces the lower layer's value outright.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use gasprobe::Settings;
use serde_json::Value;
use tracing::debug;

use crate::error::{CliError, Result};

pub const PROJECT_FILE: &str = "gasprobe.json";

/// Where config files are looked up.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
	pub global: Option<PathBuf>,
	pub project: Option<PathBuf>,
	/// The project file was named explicitly and must exist.
	pub explicit: bool,
}

impl ConfigPaths {
	/// Global file under the XDG config home, project file from `--config`
	/// or `./gasprobe.json`.
	pub fn discover(explicit: Option<PathBuf>) -> Self {
		let config_home = std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(|| dirs::home_dir().map(|h| h.join(".config")));

		Self {
			global: config_home.map(|dir| dir.join("gasprobe").join("config.json")),
			explicit: explicit.is_some(),
			project: explicit.or_else(|| Some(PathBuf::from(PROJECT_FILE))),
		}
	}
}

/// Values from global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub profile_dir: Option<PathBuf>,
	pub logs_dir: Option<PathBuf>,
	pub headless: bool,
}

impl Overrides {
	fn apply(&self, settings: &mut Settings) {
		if let Some(dir) = &self.profile_dir {
			settings.browser.profile_dir = Some(dir.clone());
		}
		if let Some(dir) = &self.logs_dir {
			settings.logs_dir = Some(dir.clone());
		}
		if self.headless {
			settings.browser.headless = true;
		}
	}
}

/// Loaded settings plus the files they came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	pub settings: Settings,
	pub sources: Vec<PathBuf>,
}

pub fn load(paths: &ConfigPaths, overrides: &Overrides) -> Result<LoadedConfig> {
	let mut merged = Value::Object(Default::default());
	let mut sources = Vec::new();

	if let Some(global) = &paths.global {
		if let Some(layer) = read_layer(global, false)? {
			merge(&mut merged, layer);
			sources.push(global.clone());
		}
	}
	if let Some(project) = &paths.project {
		if let Some(layer) = read_layer(project, paths.explicit)? {
			merge(&mut merged, layer);
			sources.push(project.clone());
		}
	}

	let mut settings: Settings = serde_json::from_value(merged).map_err(|e| CliError::Config {
		path: sources.last().cloned().unwrap_or_default(),
		message: e.to_string(),
	})?;
	overrides.apply(&mut settings);
	debug!(target = "gasprobe", sources = ?sources, "settings loaded");

	Ok(LoadedConfig { settings, sources })
}

/// Reads one JSON layer. A missing optional file is `None`.
fn read_layer(path: &Path, required: bool) -> Result<Option<Value>> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
		Err(err) => {
			return Err(CliError::Config {
				path: path.to_path_buf(),
				message: err.to_string(),
			});
		}
	};

	let value: Value = serde_json::from_str(&content).map_err(|e| CliError::Config {
		path: path.to_path_buf(),
		message: e.to_string(),
	})?;
	if !value.is_object() {
		return Err(CliError::Config {
			path: path.to_path_buf(),
			message: "top-level value must be an object".into(),
		});
	}
	Ok(Some(value))
}

/// Deep-merges `overlay` into `base`; objects merge, everything else replaces.
pub fn merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base), Value::Object(overlay)) => {
			for (key, value) in overlay {
				match base.get_mut(&key) {
					Some(existing) => merge(existing, value),
					None => {
						base.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

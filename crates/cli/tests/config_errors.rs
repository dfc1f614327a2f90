//! Config problems surface as INVALID_INPUT before any command runs.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;

fn gasprobe_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_gasprobe"))
}

fn run_in(dir: &Path, args: &[&str]) -> Result<(i32, Value)> {
	let output = Command::new(gasprobe_binary())
		.current_dir(dir)
		.env("XDG_CONFIG_HOME", dir.join("xdg"))
		.args(["-f", "json"])
		.args(args)
		.output()
		.context("failed to execute gasprobe")?;

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let json = serde_json::from_str(&stdout).with_context(|| format!("stdout is not JSON: {stdout}"))?;
	Ok((output.status.code().unwrap_or(-1), json))
}

fn write_log(dir: &Path) -> Result<String> {
	let log = dir.join("run_testAllNewFunctions_20260110_101500.log");
	std::fs::write(&log, "placeholder")?;
	Ok(log.to_str().context("utf-8 path")?.to_string())
}

#[test]
fn malformed_project_file() -> Result<()> {
	let dir = TempDir::new()?;
	std::fs::write(dir.path().join("gasprobe.json"), "{ \"tests\": ")?;
	let log = write_log(dir.path())?;

	let (status, json) = run_in(dir.path(), &["parse", &log])?;

	assert_eq!(status, 1);
	assert_eq!(json["ok"], false);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
	let message = json["error"]["message"].as_str().unwrap_or_default();
	assert!(message.contains("gasprobe.json"), "got: {message}");
	Ok(())
}

#[test]
fn explicit_config_must_exist() -> Result<()> {
	let dir = TempDir::new()?;
	let log = write_log(dir.path())?;

	let (status, json) = run_in(dir.path(), &["--config", "missing.json", "parse", &log])?;

	assert_eq!(status, 1);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
	Ok(())
}

#[test]
fn non_object_global_file() -> Result<()> {
	let dir = TempDir::new()?;
	let global = dir.path().join("xdg").join("gasprobe");
	std::fs::create_dir_all(&global)?;
	std::fs::write(global.join("config.json"), "[1, 2, 3]")?;
	let log = write_log(dir.path())?;

	let (status, json) = run_in(dir.path(), &["parse", &log])?;

	assert_eq!(status, 1);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
	Ok(())
}

#[test]
fn project_file_settings_reach_the_command() -> Result<()> {
	let dir = TempDir::new()?;
	std::fs::write(
		dir.path().join("gasprobe.json"),
		r#"{ "tests": { "functions": ["testAllNewFunctions", "testMailFunctions"] } }"#,
	)?;
	let log = dir.path().join("run_testAllNewFunctions_20260110_101500.log");
	std::fs::write(
		&log,
		"testAllNewFunctions: テスト開始\n✅ testMailFunctions: 下書きの作成 OK\n下書きの件名と本文と宛先を順に確認しました。すべて想定どおりの値でした。\ntestAllNewFunctions: テスト完了\n",
	)?;

	let (status, json) = run_in(dir.path(), &["parse", log.to_str().context("utf-8 path")?])?;

	assert_eq!(status, 0, "{json}");
	let mentioned = json["data"]["functionsMentioned"].as_array().context("functionsMentioned")?;
	assert_eq!(mentioned.len(), 2);
	Ok(())
}

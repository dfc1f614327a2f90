//! End-to-end runs of `gasprobe parse` against saved log files.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;

fn gasprobe_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_gasprobe"))
}

struct Run {
	status: i32,
	json: Value,
	stderr: String,
}

/// Runs the binary inside `dir` with no user config in reach.
fn run_in(dir: &Path, args: &[&str]) -> Result<Run> {
	let output = Command::new(gasprobe_binary())
		.current_dir(dir)
		.env("XDG_CONFIG_HOME", dir.join("xdg"))
		.args(["-f", "json"])
		.args(args)
		.output()
		.context("failed to execute gasprobe")?;

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let json = serde_json::from_str(&stdout).with_context(|| format!("stdout is not JSON: {stdout}"))?;
	Ok(Run {
		status: output.status.code().unwrap_or(-1),
		json,
		stderr: String::from_utf8_lossy(&output.stderr).to_string(),
	})
}

const PASSING_LOG: &str = "\
10:15:00 情報 testAllNewFunctions: テスト開始
10:15:01 情報 ✅ testSheetFunctions: シートの読み込み OK
10:15:02 情報 ✅ testCalendarFunctions: 予定の作成 OK
10:15:03 情報 ✅ testMailFunctions: 下書きの作成 OK
10:15:04 情報 testAllNewFunctions: 全テスト完了
";

const FAILING_LOG: &str = "\
10:15:00 情報 testAllNewFunctions: テスト開始
10:15:01 情報 ✅ testSheetFunctions: シートの読み込み OK
10:15:02 エラー ❌ testCalendarFunctions: TypeError: Cannot read properties of undefined
10:15:03 情報 testMailFunctions: 下書きの作成を確認しています
10:15:04 情報 testAllNewFunctions: 全テスト完了
";

#[test]
fn passing_log_exits_zero() -> Result<()> {
	let dir = TempDir::new()?;
	let log = dir.path().join("run_testAllNewFunctions_20260110_101500.log");
	std::fs::write(&log, PASSING_LOG)?;

	let run = run_in(dir.path(), &["parse", log.to_str().context("utf-8 path")?])?;

	assert_eq!(run.status, 0, "stderr: {}", run.stderr);
	assert_eq!(run.json["ok"], true);
	assert_eq!(run.json["command"], "parse");
	assert_eq!(run.json["data"]["testFunction"], "testAllNewFunctions");
	assert_eq!(run.json["data"]["outcome"], "passed");
	Ok(())
}

#[test]
fn failing_log_prints_envelope_and_exits_one() -> Result<()> {
	let dir = TempDir::new()?;
	let log = dir.path().join("saved.log");
	std::fs::write(&log, FAILING_LOG)?;

	let run = run_in(
		dir.path(),
		&["parse", log.to_str().context("utf-8 path")?, "--function", "testAllNewFunctions"],
	)?;

	assert_eq!(run.status, 1);
	assert_eq!(run.json["ok"], true, "a failed test is still a completed command");
	assert_eq!(run.json["data"]["outcome"], "failed");
	assert_eq!(run.json["data"]["success"], false);
	Ok(())
}

#[test]
fn short_log_is_not_a_pass() -> Result<()> {
	let dir = TempDir::new()?;
	let log = dir.path().join("run_testAllNewFunctions_20260110_101500.log");
	std::fs::write(&log, "読み込んでいます")?;

	let run = run_in(dir.path(), &["parse", log.to_str().context("utf-8 path")?])?;

	assert_eq!(run.status, 1);
	assert_eq!(run.json["data"]["outcome"], "unknown");
	Ok(())
}

#[test]
fn missing_log_reports_io_error() -> Result<()> {
	let dir = TempDir::new()?;

	let run = run_in(
		dir.path(),
		&["parse", "run_testAllNewFunctions_20260110_101500.log"],
	)?;

	assert_eq!(run.status, 1);
	assert_eq!(run.json["ok"], false);
	assert_eq!(run.json["error"]["code"], "IO_ERROR");
	Ok(())
}

#[test]
fn unnamed_log_needs_function_flag() -> Result<()> {
	let dir = TempDir::new()?;
	let log = dir.path().join("notes.log");
	std::fs::write(&log, PASSING_LOG)?;

	let run = run_in(dir.path(), &["parse", log.to_str().context("utf-8 path")?])?;

	assert_eq!(run.status, 1);
	assert_eq!(run.json["error"]["code"], "INVALID_INPUT");
	let message = run.json["error"]["message"].as_str().unwrap_or_default();
	assert!(message.contains("--function"), "got: {message}");
	Ok(())
}

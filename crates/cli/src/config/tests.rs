use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use super::*;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
	let path = dir.path().join(name);
	std::fs::write(&path, content).unwrap();
	path
}

fn paths(global: Option<PathBuf>, project: Option<PathBuf>, explicit: bool) -> ConfigPaths {
	ConfigPaths {
		global,
		project,
		explicit,
	}
}

#[test]
fn no_files_gives_defaults() {
	let tmp = TempDir::new().unwrap();
	let loaded = load(
		&paths(Some(tmp.path().join("absent.json")), Some(tmp.path().join("gasprobe.json")), false),
		&Overrides::default(),
	)
	.unwrap();

	assert_eq!(loaded.settings, Settings::default());
	assert!(loaded.sources.is_empty());
}

#[test]
fn project_overrides_global_and_flags_override_both() {
	let tmp = TempDir::new().unwrap();
	let global = write(
		&tmp,
		"global.json",
		r#"{"browser":{"headless":false,"width":1280},"logsDir":"/var/log/gasprobe","tests":{"pauseSecs":3}}"#,
	);
	let project = write(&tmp, "gasprobe.json", r#"{"browser":{"width":1600},"tests":{"pauseSecs":0}}"#);

	let overrides = Overrides {
		logs_dir: Some(PathBuf::from("run-logs")),
		headless: true,
		..Default::default()
	};
	let loaded = load(&paths(Some(global.clone()), Some(project.clone()), false), &overrides).unwrap();
	let settings = loaded.settings;

	assert_eq!(settings.browser.width, 1600);
	assert_eq!(settings.browser.height, 1080);
	assert!(settings.browser.headless);
	assert_eq!(settings.tests.pause_secs, 0);
	assert_eq!(settings.logs_dir(), PathBuf::from("run-logs"));
	assert_eq!(loaded.sources, vec![global, project]);
}

#[test]
fn missing_explicit_config_is_an_error() {
	let tmp = TempDir::new().unwrap();
	let missing = tmp.path().join("custom.json");
	let err = load(&paths(None, Some(missing.clone()), true), &Overrides::default()).unwrap_err();

	match err {
		CliError::Config { path, .. } => assert_eq!(path, missing),
		other => panic!("expected config error, got {other:?}"),
	}
}

#[test]
fn malformed_json_names_the_file() {
	let tmp = TempDir::new().unwrap();
	let project = write(&tmp, "gasprobe.json", "{ not json");
	let err = load(&paths(None, Some(project), false), &Overrides::default()).unwrap_err();
	assert!(err.to_string().contains("gasprobe.json"), "{err}");
}

#[test]
fn wrong_field_type_is_a_config_error() {
	let tmp = TempDir::new().unwrap();
	let project = write(&tmp, "gasprobe.json", r#"{"browser":{"width":"wide"}}"#);
	let err = load(&paths(None, Some(project), false), &Overrides::default()).unwrap_err();
	assert!(matches!(err, CliError::Config { .. }));
}

#[test]
fn merge_replaces_arrays_and_scalars() {
	let mut base = json!({ "tests": { "failed": ["a", "b"], "pauseSecs": 10 }, "keep": true });
	merge(&mut base, json!({ "tests": { "failed": ["c"] } }));
	assert_eq!(base, json!({ "tests": { "failed": ["c"], "pauseSecs": 10 }, "keep": true }));
}

#[test]
fn discover_uses_explicit_path() {
	let paths = ConfigPaths::discover(Some(PathBuf::from("ci.json")));
	assert!(paths.explicit);
	assert_eq!(paths.project, Some(PathBuf::from("ci.json")));

	let paths = ConfigPaths::discover(None);
	assert!(!paths.explicit);
	assert_eq!(paths.project, Some(PathBuf::from(PROJECT_FILE)));
}

use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_run_with_default_function() {
	let cli = Cli::try_parse_from(["gasprobe", "run"]).unwrap();
	match cli.command {
		Commands::Run(args) => {
			assert_eq!(args.function, None);
			assert!(!args.prepare);
		}
		_ => panic!("Expected Run command"),
	}
}

#[test]
fn parse_run_prepare() {
	let cli = Cli::try_parse_from(["gasprobe", "run", "createTestEvent", "--prepare"]).unwrap();
	match cli.command {
		Commands::Run(args) => {
			assert_eq!(args.function.as_deref(), Some("createTestEvent"));
			assert!(args.prepare);
		}
		_ => panic!("Expected Run command"),
	}
}

#[test]
fn parse_rerun_functions() {
	let cli = Cli::try_parse_from(["gasprobe", "rerun", "testErrorHandling", "testAll", "--pause", "0"]).unwrap();
	match cli.command {
		Commands::Rerun(args) => {
			assert_eq!(args.functions, vec!["testErrorHandling", "testAll"]);
			assert_eq!(args.pause, Some(0));
		}
		_ => panic!("Expected Rerun command"),
	}
}

#[test]
fn parse_api_subcommands() {
	let cli = Cli::try_parse_from(["gasprobe", "api", "run", "testAll", "--dev-mode"]).unwrap();
	match cli.command {
		Commands::Api(ApiAction::Run { functions, dev_mode }) => {
			assert_eq!(functions, vec!["testAll"]);
			assert!(dev_mode);
		}
		_ => panic!("Expected Api Run command"),
	}

	let cli = Cli::try_parse_from(["gasprobe", "api", "login"]).unwrap();
	assert!(matches!(cli.command, Commands::Api(ApiAction::Login)));
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from([
		"gasprobe",
		"run-all",
		"-vv",
		"-f",
		"json",
		"--headless",
		"--logs-dir",
		"out",
		"--profile-dir",
		"/tmp/profile",
	])
	.unwrap();

	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.format, OutputFormat::Json);
	let overrides = cli.overrides();
	assert!(overrides.headless);
	assert_eq!(overrides.logs_dir, Some(PathBuf::from("out")));
	assert_eq!(overrides.profile_dir, Some(PathBuf::from("/tmp/profile")));
}

#[test]
fn parse_requires_a_file() {
	assert!(Cli::try_parse_from(["gasprobe", "parse"]).is_err());
	let cli = Cli::try_parse_from(["gasprobe", "parse", "logs/run_testAll_20260101_120000.log"]).unwrap();
	assert!(matches!(cli.command, Commands::Parse(_)));
}

#[test]
fn default_format_is_toon() {
	let cli = Cli::try_parse_from(["gasprobe", "check-logs"]).unwrap();
	assert_eq!(cli.format, OutputFormat::Toon);
	assert_eq!(cli.verbose, 0);
}

#[test]
fn command_names_match_envelope() {
	let cli = Cli::try_parse_from(["gasprobe", "api", "login"]).unwrap();
	assert_eq!(cli.command.name(), "api login");
	let cli = Cli::try_parse_from(["gasprobe", "check-logs"]).unwrap();
	assert_eq!(cli.command.name(), "check-logs");
}

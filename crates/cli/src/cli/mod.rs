#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::output::OutputFormat;

/// Cargo's help colors.
fn help_styles() -> Styles {
	let accent = AnsiColor::Cyan.on_default();
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(accent)
		.placeholder(accent)
		.valid(accent)
}

/// Root CLI.
#[derive(Parser, Debug)]
#[command(name = "gasprobe")]
#[command(about = "Run and check script-project tests through the editor UI or the execution API")]
#[command(version)]
#[command(styles = help_styles())]
pub struct Cli {
	/// Increase verbosity (-v progress, -vv debug, -vvv trace with CDP traffic)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// Project config file (default: ./gasprobe.json when present)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Persistent browser profile directory
	#[arg(long, global = true, value_name = "DIR")]
	pub profile_dir: Option<PathBuf>,

	/// Directory for run logs, reports and screenshots
	#[arg(long, global = true, value_name = "DIR")]
	pub logs_dir: Option<PathBuf>,

	/// Run the browser without a window
	#[arg(long, global = true)]
	pub headless: bool,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	pub fn overrides(&self) -> Overrides {
		Overrides {
			profile_dir: self.profile_dir.clone(),
			logs_dir: self.logs_dir.clone(),
			headless: self.headless,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run one test function in the script editor.
	Run(RunArgs),
	/// Run every configured test function and write a report.
	RunAll(RunAllArgs),
	/// Re-run selected (default: previously failing) functions with longer retries.
	Rerun(RerunArgs),
	/// Read the execution log the editor currently shows.
	CheckLogs(CheckLogsArgs),
	/// Classify a saved log file offline.
	Parse(ParseArgs),
	/// Inspect the configured spreadsheets.
	Sheets(SheetsArgs),
	/// Collect cohort courses and draft reservation rows.
	Courses(CoursesArgs),
	/// Call functions through the script-execution API.
	#[command(subcommand)]
	Api(ApiAction),
}

impl Commands {
	/// Name used in the output envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Run(_) => "run",
			Commands::RunAll(_) => "run-all",
			Commands::Rerun(_) => "rerun",
			Commands::CheckLogs(_) => "check-logs",
			Commands::Parse(_) => "parse",
			Commands::Sheets(_) => "sheets",
			Commands::Courses(_) => "courses",
			Commands::Api(ApiAction::Run { .. }) => "api run",
			Commands::Api(ApiAction::Login) => "api login",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Function to run (default from config: testAllNewFunctions, or
	/// createTestEvent with --prepare)
	#[arg(value_name = "FUNCTION")]
	pub function: Option<String>,

	/// Start the function and wait briefly; skip log scraping
	#[arg(long)]
	pub prepare: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunAllArgs {
	/// Seconds to pause between functions (default from config)
	#[arg(long, value_name = "SECS")]
	pub pause: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RerunArgs {
	/// Functions to re-run (default: the configured failed list)
	#[arg(value_name = "FUNCTION")]
	pub functions: Vec<String>,

	/// Seconds to pause between functions (default from config)
	#[arg(long, value_name = "SECS")]
	pub pause: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckLogsArgs {
	/// Include the full scraped log text in the output
	#[arg(long)]
	pub show_text: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
	/// Saved execution log
	#[arg(value_name = "FILE")]
	pub file: PathBuf,

	/// Test function the log belongs to (default: taken from run_<name>_<ts>.log)
	#[arg(long, value_name = "NAME")]
	pub function: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SheetsArgs {
	/// Only inspect spreadsheets whose name contains this text
	#[arg(long, value_name = "NAME")]
	pub only: Option<String>,

	/// Skip per-spreadsheet screenshots
	#[arg(long)]
	pub no_screenshot: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CoursesArgs {
	/// Cohort label to filter by (default from config)
	#[arg(long, value_name = "LABEL")]
	pub cohort: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ApiAction {
	/// Invoke functions and write an API report.
	Run {
		/// Functions to call (default: the configured default function)
		#[arg(value_name = "FUNCTION")]
		functions: Vec<String>,

		/// Run the latest saved code instead of the deployed version
		#[arg(long)]
		dev_mode: bool,
	},
	/// Authorize (or refresh) and store the OAuth token.
	Login,
}

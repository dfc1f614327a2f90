mod api;
mod check_logs;
mod courses;
mod parse;
mod run;
mod sheets;
mod suite;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let ctx = CommandContext::from_cli(&cli)?;

	match cli.command {
		Commands::Run(args) => run::execute(&ctx, args).await,
		Commands::RunAll(args) => suite::run_all(&ctx, args).await,
		Commands::Rerun(args) => suite::rerun(&ctx, args).await,
		Commands::CheckLogs(args) => check_logs::execute(&ctx, args).await,
		Commands::Parse(args) => parse::execute(&ctx, args),
		Commands::Sheets(args) => sheets::execute(&ctx, args).await,
		Commands::Courses(args) => courses::execute(&ctx, args).await,
		Commands::Api(action) => api::execute(&ctx, action).await,
	}
}

/// Exit status 1 once the envelope is out, when a verdict was not a pass.
fn verdict(passed: bool) -> Result<()> {
	if passed {
		Ok(())
	} else {
		Err(CliError::OutputAlreadyPrinted)
	}
}

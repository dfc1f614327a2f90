//! Spreadsheet structure inspection.

use gasprobe::sheets::{self, SheetInspection};
use tracing::warn;

use crate::cli::SheetsArgs;
use crate::context::{CommandContext, close_session};
use crate::error::{CliError, Result};
use crate::output::{Artifact, ArtifactType, CommandInputs, DiagnosticLevel, ResultBuilder, print_result};

pub async fn execute(ctx: &CommandContext, args: SheetsArgs) -> Result<()> {
	let targets: Vec<_> = ctx
		.settings
		.spreadsheets
		.0
		.iter()
		.filter(|t| args.only.as_deref().is_none_or(|only| t.name.contains(only)))
		.cloned()
		.collect();
	if targets.is_empty() {
		return Err(CliError::InvalidInput("no spreadsheets match the selection".into()));
	}
	let screenshot_dir = (!args.no_screenshot).then(|| ctx.settings.logs_dir());

	let session = ctx.launch().await?;
	let mut inspections: Vec<SheetInspection> = Vec::with_capacity(targets.len());
	let mut failure = None;
	for target in &targets {
		match sheets::inspect(&session, target, screenshot_dir.as_deref()).await {
			Ok(inspection) => inspections.push(inspection),
			Err(err) => {
				warn!(target = "gasprobe", sheet = %target.name, error = %err, "inspection aborted");
				failure = Some(err);
				break;
			}
		}
	}
	close_session(session).await;
	if let Some(err) = failure {
		return Err(err.into());
	}

	let mut builder = ResultBuilder::new("sheets")
		.inputs(CommandInputs {
			extra: args.only.map(|only| serde_json::json!({ "only": only })),
			..Default::default()
		})
		.config(ctx.effective_config());
	for inspection in &inspections {
		for warning in &inspection.warnings {
			builder = builder.diagnostic_with_source(DiagnosticLevel::Warning, warning, &inspection.name);
		}
		if let Some(path) = &inspection.screenshot {
			builder = builder.artifact(Artifact::file(ArtifactType::Screenshot, path));
		}
	}
	print_result(&builder.data(inspections).build(), ctx.format);
	Ok(())
}

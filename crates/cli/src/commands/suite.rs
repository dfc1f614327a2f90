//! Multi-function runs (`run-all`, `rerun`, `api run`) and their reports.

use std::time::{Duration, Instant};

use gasprobe::{EditorRunner, ReportKind, RetryPolicy, SuiteOptions, run_suite};
use gasprobe_protocol::{Report, ReportSource, TestResult};
use tracing::info;

use super::verdict;
use crate::cli::{RerunArgs, RunAllArgs};
use crate::context::{CommandContext, close_session};
use crate::error::{CliError, Result};
use crate::output::{Artifact, ArtifactType, CommandInputs, ResultBuilder, print_report, result_artifacts};

pub async fn run_all(ctx: &CommandContext, args: RunAllArgs) -> Result<()> {
	let functions = ctx.settings.tests.functions.clone();
	let options = SuiteOptions {
		policy: RetryPolicy::full_run(),
		pause: Duration::from_secs(args.pause.unwrap_or(ctx.settings.tests.pause_secs)),
	};
	run_in_editor(ctx, "run-all", functions, options, ReportKind::Full).await
}

pub async fn rerun(ctx: &CommandContext, args: RerunArgs) -> Result<()> {
	let functions = if args.functions.is_empty() {
		ctx.settings.tests.failed.clone()
	} else {
		args.functions
	};
	let options = SuiteOptions {
		policy: RetryPolicy::rerun(),
		pause: Duration::from_secs(args.pause.unwrap_or(ctx.settings.tests.rerun_pause_secs)),
	};
	run_in_editor(ctx, "rerun", functions, options, ReportKind::Rerun).await
}

async fn run_in_editor(
	ctx: &CommandContext,
	command: &'static str,
	functions: Vec<String>,
	options: SuiteOptions,
	kind: ReportKind,
) -> Result<()> {
	if functions.is_empty() {
		return Err(CliError::InvalidInput("no test functions configured".into()));
	}
	let start = Instant::now();
	info!(target = "gasprobe", command, count = functions.len(), "starting editor run");

	let session = ctx.launch().await?;
	let results = {
		let mut runner = EditorRunner::new(&session, &ctx.settings, ctx.store());
		run_suite(&mut runner, &functions, &options).await
	};
	close_session(session).await;

	report(ctx, command, start, functions, results, ReportSource::Editor, kind)
}

/// Builds, saves and prints the report; exits 1 unless every test passed.
pub fn report(
	ctx: &CommandContext,
	command: &'static str,
	start: Instant,
	functions: Vec<String>,
	results: Vec<TestResult>,
	source: ReportSource,
	kind: ReportKind,
) -> Result<()> {
	let planned = functions.len();
	let report = Report::build(source, planned, results);
	let path = ctx.store().save_report(kind, &report)?;
	info!(target = "gasprobe", path = %path.display(), "report saved");

	let all_passed = report.all_passed();
	let built = ResultBuilder::new(command)
		.started_at(start)
		.inputs(CommandInputs {
			functions,
			..Default::default()
		})
		.artifacts(result_artifacts(&report.results))
		.artifact(Artifact::file(ArtifactType::Report, path))
		.config(ctx.effective_config())
		.data(report)
		.build();
	print_report(&built, planned, ctx.format);
	verdict(all_passed)
}

//! Single-function run in the script editor.

use gasprobe::settings::TestSettings;
use gasprobe::{EditorRunner, RetryPolicy, run_with_retry};
use gasprobe_protocol::TestResult;
use tracing::info;

use super::verdict;
use crate::cli::RunArgs;
use crate::context::{CommandContext, close_session};
use crate::error::Result;
use crate::output::{Artifact, ArtifactType, CommandInputs, ResultBuilder, print_result, result_artifacts};

pub async fn execute(ctx: &CommandContext, args: RunArgs) -> Result<()> {
	let function = target_function(&args, &ctx.settings.tests);
	let inputs = CommandInputs {
		functions: vec![function.clone()],
		extra: args.prepare.then(|| serde_json::json!({ "prepare": true })),
		..Default::default()
	};

	let session = ctx.launch().await?;
	let runner = EditorRunner::new(&session, &ctx.settings, ctx.store());

	if args.prepare {
		info!(target = "gasprobe", function = %function, "prepare-only run");
		let outcome = runner.prepare(&function).await;
		drop(runner);
		close_session(session).await;
		let outcome = outcome?;

		let started = outcome.started;
		let mut builder = ResultBuilder::new("run")
			.inputs(inputs)
			.config(ctx.effective_config());
		if let Some(path) = &outcome.screenshot {
			builder = builder.artifact(Artifact::file(ArtifactType::Screenshot, path));
		}
		print_result(&builder.data(outcome).build(), ctx.format);
		return verdict(started);
	}

	let result: TestResult = {
		let mut runner = runner;
		run_with_retry(&mut runner, &function, &RetryPolicy::full_run()).await
	};
	close_session(session).await;

	let passed = result.success;
	let built = ResultBuilder::new("run")
		.inputs(inputs)
		.artifacts(result_artifacts(std::slice::from_ref(&result)))
		.config(ctx.effective_config())
		.data(result)
		.build();
	print_result(&built, ctx.format);
	verdict(passed)
}

/// The named function, else the configured prepare or default function.
fn target_function(args: &RunArgs, tests: &TestSettings) -> String {
	match &args.function {
		Some(name) => name.clone(),
		None if args.prepare => tests.prepare_function.clone(),
		None => tests.default_function.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(function: Option<&str>, prepare: bool) -> RunArgs {
		RunArgs {
			function: function.map(String::from),
			prepare,
		}
	}

	#[test]
	fn prepare_defaults_to_prepare_function() {
		let tests = TestSettings::default();
		assert_eq!(target_function(&args(None, true), &tests), "createTestEvent");
		assert_eq!(target_function(&args(None, false), &tests), "testAllNewFunctions");
	}

	#[test]
	fn named_function_wins() {
		let tests = TestSettings::default();
		assert_eq!(target_function(&args(Some("testEditHandler"), true), &tests), "testEditHandler");
	}
}

//! Script-execution API commands.

use std::time::{Duration, Instant};

use gasprobe::{ApiRunner, Authorizer, ReportKind, RetryPolicy, ScriptClient, SuiteOptions, run_suite};
use gasprobe_protocol::ReportSource;
use serde::Serialize;
use tracing::info;

use super::suite;
use crate::cli::ApiAction;
use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{Artifact, ArtifactType, ResultBuilder, print_result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
	token_file: std::path::PathBuf,
	#[serde(skip_serializing_if = "Option::is_none")]
	expiry: Option<chrono::DateTime<chrono::Utc>>,
	scopes: Vec<String>,
	refreshable: bool,
}

pub async fn execute(ctx: &CommandContext, action: ApiAction) -> Result<()> {
	match action {
		ApiAction::Run { functions, dev_mode } => run(ctx, functions, dev_mode).await,
		ApiAction::Login => login(ctx).await,
	}
}

async fn run(ctx: &CommandContext, functions: Vec<String>, dev_mode: bool) -> Result<()> {
	let api = &ctx.settings.api;
	let functions = if functions.is_empty() {
		vec![ctx.settings.tests.default_function.clone()]
	} else {
		functions
	};
	let start = Instant::now();

	let user = Authorizer::from_settings(api).credentials().await?;
	let client = ScriptClient::new(&api.script_id, user.access_token);
	let mut runner = ApiRunner::new(client, dev_mode || api.dev_mode).with_store(ctx.store());
	info!(target = "gasprobe", script = %api.script_id, count = functions.len(), "calling script API");

	let options = SuiteOptions {
		policy: RetryPolicy::full_run(),
		pause: Duration::ZERO,
	};
	let results = run_suite(&mut runner, &functions, &options).await;
	suite::report(ctx, "api run", start, functions, results, ReportSource::Api, ReportKind::Api)
}

async fn login(ctx: &CommandContext) -> Result<()> {
	let authorizer = Authorizer::from_settings(&ctx.settings.api);
	let user = authorizer.login().await?;
	let token_file = authorizer.token_path().to_path_buf();

	let data = LoginData {
		token_file: token_file.clone(),
		expiry: user.expiry,
		refreshable: user.can_refresh(),
		scopes: user.scopes,
	};
	let built = ResultBuilder::new("api login")
		.artifact(Artifact::file(ArtifactType::Token, token_file))
		.data(data)
		.build();
	print_result(&built, ctx.format);
	Ok(())
}

//! Reads the execution log currently shown in the editor.

use std::io::Write;

use colored::Colorize;
use gasprobe::EditorRunner;
use gasprobe::classify::{FunctionMention, Mention};
use serde::Serialize;

use crate::cli::CheckLogsArgs;
use crate::context::{CommandContext, close_session};
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

/// Error lines beyond this are counted but not listed.
const MAX_ERROR_LINES: usize = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckLogsData {
	log_chars: usize,
	mentions: Vec<FunctionMention>,
	error_line_count: usize,
	error_lines: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	text: Option<String>,
}

pub async fn execute(ctx: &CommandContext, args: CheckLogsArgs) -> Result<()> {
	let session = ctx.launch().await?;
	let check = EditorRunner::new(&session, &ctx.settings, ctx.store()).check_logs().await;
	close_session(session).await;
	let check = check?;

	let data = CheckLogsData {
		log_chars: check.text.chars().count(),
		error_line_count: check.error_lines.len(),
		error_lines: check.error_lines.into_iter().take(MAX_ERROR_LINES).collect(),
		mentions: check.mentions,
		text: args.show_text.then_some(check.text),
	};

	if ctx.format == OutputFormat::Text {
		print_text(&data);
		return Ok(());
	}
	let built = ResultBuilder::new("check-logs")
		.config(ctx.effective_config())
		.data(data)
		.build();
	print_result(&built, ctx.format);
	Ok(())
}

fn print_text(data: &CheckLogsData) {
	let mut stdout = std::io::stdout().lock();
	if let Some(text) = &data.text {
		let _ = writeln!(stdout, "{text}\n");
	}
	let _ = writeln!(stdout, "log: {} chars", data.log_chars);
	for mention in &data.mentions {
		let label = match mention.mention {
			Mention::Passed => mention.mention.to_string().green(),
			Mention::Error => mention.mention.to_string().red(),
			Mention::Warning => mention.mention.to_string().yellow(),
			Mention::Executed => mention.mention.to_string().normal(),
			Mention::NotSeen => mention.mention.to_string().dimmed(),
		};
		let _ = writeln!(stdout, "  {:<40} {label}", mention.function);
	}
	if data.error_line_count > 0 {
		let _ = writeln!(stdout, "\nerror lines ({}):", data.error_line_count);
		for line in &data.error_lines {
			let _ = writeln!(stdout, "  {line}");
		}
	}
}

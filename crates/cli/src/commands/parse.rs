//! Offline classification of a saved log file.

use std::path::Path;

use gasprobe::LogStore;
use gasprobe::classify::classify;

use super::verdict;
use crate::cli::ParseArgs;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandInputs, ResultBuilder, print_result};

pub fn execute(ctx: &CommandContext, args: ParseArgs) -> Result<()> {
	let function = match args.function {
		Some(name) => name,
		None => function_from_log_name(&args.file).ok_or_else(|| {
			CliError::InvalidInput(format!(
				"cannot tell the test function from {}; pass --function",
				args.file.display()
			))
		})?,
	};
	let content = LogStore::read(&args.file)?;

	let tests = &ctx.settings.tests;
	let result = classify(&content, &tests.functions, &tests.expected_errors)
		.into_result(&function)
		.with_log_file(args.file.clone());

	let passed = result.success;
	let built = ResultBuilder::new("parse")
		.inputs(CommandInputs {
			functions: vec![function],
			path: Some(args.file),
			..Default::default()
		})
		.data(result)
		.build();
	print_result(&built, ctx.format);
	verdict(passed)
}

/// `run_<function>_<YYYYmmdd>_<HHMMSS>.log` → `<function>`.
fn function_from_log_name(path: &Path) -> Option<String> {
	let stem = path.file_name()?.to_str()?.strip_suffix(".log")?;
	let rest = stem.strip_prefix("run_")?;
	let mut parts = rest.rsplitn(3, '_');
	let time = parts.next()?;
	let date = parts.next()?;
	let function = parts.next()?;
	let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
	(digits(date, 8) && digits(time, 6) && !function.is_empty()).then(|| function.to_string())
}

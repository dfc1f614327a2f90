//! Course list to reservation drafts.

use gasprobe::courses::plan_reservations;
use gasprobe::settings::CourseSettings;

use crate::cli::CoursesArgs;
use crate::context::{CommandContext, close_session};
use crate::error::Result;
use crate::output::{CommandInputs, DiagnosticLevel, ResultBuilder, print_result};

pub async fn execute(ctx: &CommandContext, args: CoursesArgs) -> Result<()> {
	let settings = CourseSettings {
		cohort: args.cohort.unwrap_or_else(|| ctx.settings.courses.cohort.clone()),
		..ctx.settings.courses.clone()
	};

	let session = ctx.launch().await?;
	let plan = plan_reservations(&session, &settings).await;
	close_session(session).await;
	let plan = plan?;

	let mut builder = ResultBuilder::new("courses")
		.inputs(CommandInputs {
			extra: Some(serde_json::json!({ "cohort": settings.cohort, "spreadsheetId": settings.spreadsheet_id })),
			..Default::default()
		})
		.config(ctx.effective_config());
	if plan.cohort_courses == 0 {
		builder = builder.diagnostic(
			DiagnosticLevel::Warning,
			format!("no courses found for cohort {}", plan.cohort),
		);
	}
	print_result(&builder.data(plan).build(), ctx.format);
	Ok(())
}

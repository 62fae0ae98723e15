use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use sked_core::error::CoreError;
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::cli::DeleteCommand;
use crate::util::resolve_schedule_id;

pub async fn delete_schedule<R: Repository + Sync>(ctx: &Context<'_, R>, command: DeleteCommand) -> Result<()> {
    let id = resolve_schedule_id(ctx.repo, ctx.owner, &command.id).await?;
    let schedule = ctx
        .repo
        .find_schedule(ctx.owner, id)
        .await?
        .ok_or_else(|| CoreError::ScheduleNotFound(id.to_string()))?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to delete '{}' and all its occurrences?",
                schedule.title
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    ctx.repo.delete_schedule(ctx.owner, id).await?;

    if ctx.json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    let success_style = Style::new().green().bold();
    println!(
        "{} Deleted schedule: {} ({})",
        "✓".style(success_style),
        schedule.title.bright_white().bold(),
        id.to_string().yellow()
    );
    Ok(())
}

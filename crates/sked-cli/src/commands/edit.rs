use anyhow::Result;
use dialoguer::Select;
use owo_colors::{OwoColorize, Style};
use sked_core::models::{Color, EditedFields, Importance, ModifyOutcome, ModifyType, OccurrenceSlot};
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::cli::EditCommand;
use crate::parser::{parse_datetime, parse_flag, parse_repeat};
use crate::util::resolve_schedule_id;

pub async fn edit_schedule<R: Repository + Sync>(ctx: &Context<'_, R>, command: EditCommand) -> Result<()> {
    let requested = command
        .scope
        .as_deref()
        .map(str::parse::<ModifyType>)
        .transpose()?;

    let schedule_id = resolve_schedule_id(ctx.repo, ctx.owner, &command.id).await?;
    let detail = ctx.repo.find_schedule_detail(ctx.owner, schedule_id).await?;

    let modify_type = match requested {
        Some(modify_type) => modify_type,
        None if detail.rule.is_some() => {
            let options = [
                "This occurrence only",
                "This and all following occurrences",
                "Every occurrence",
            ];
            println!("{}", "This schedule repeats.".yellow());
            let selection = Select::new()
                .with_prompt("How would you like to apply your changes?")
                .items(&options[..])
                .default(0)
                .interact()?;
            match selection {
                0 => ModifyType::Only,
                1 => ModifyType::AfterAll,
                _ => ModifyType::All,
            }
        }
        None => ModifyType::All,
    };

    let occurrence = match &command.occurrence {
        Some(start) => {
            let start = parse_datetime(start)?;
            Some(OccurrenceSlot::new(start, start + detail.schedule.duration()))
        }
        None => None,
    };

    let edited = EditedFields {
        title: command.title,
        note: command.note,
        color: parse_flag::<Color>(command.color.as_deref())?,
        importance: parse_flag::<Importance>(command.importance.as_deref())?,
        tags: command.tag,
        start_date: command.start.as_deref().map(parse_datetime).transpose()?,
        end_date: command.end.as_deref().map(parse_datetime).transpose()?,
        repeat: parse_repeat(&command.repeat)?,
        reminders: command.remind,
        occurrence,
    };

    let outcome = ctx
        .repo
        .modify_schedule(ctx.owner, schedule_id, modify_type, edited)
        .await?;
    tracing::info!(%schedule_id, %modify_type, ?outcome, "schedule modified");

    if ctx.json {
        return print_json(&outcome);
    }

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    match outcome {
        ModifyOutcome::Detached { schedule_id, .. } => {
            println!("{} Moved one occurrence out of the series", "✓".style(success_style));
            println!("  {} New schedule: {}", "→".style(info_style), schedule_id.to_string().yellow());
        }
        ModifyOutcome::AlreadyApplied { schedule_id, .. } => {
            println!(
                "{} That occurrence was already edited; nothing changed",
                "•".style(info_style)
            );
            println!("  {} Existing schedule: {}", "→".style(info_style), schedule_id.to_string().yellow());
        }
        ModifyOutcome::Forked { original_id, schedule_id } => {
            println!("{} Split the series", "✓".style(success_style));
            println!("  {} Earlier part: {}", "→".style(info_style), original_id.to_string().yellow());
            println!("  {} From here on: {}", "→".style(info_style), schedule_id.to_string().yellow());
        }
        ModifyOutcome::Updated { schedule_id } => {
            println!(
                "{} Updated schedule: {}",
                "✓".style(success_style),
                schedule_id.to_string().yellow()
            );
        }
    }
    Ok(())
}

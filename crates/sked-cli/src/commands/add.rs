use anyhow::Result;
use chrono::Duration;
use owo_colors::{OwoColorize, Style};
use sked_core::models::{Color, Importance, NewSchedule};
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::cli::AddCommand;
use crate::parser::{parse_datetime, parse_flag, parse_repeat};
use crate::timezone::format_span;
use crate::views::table::SHORT_ID_LEN;

pub async fn add_schedule<R: Repository + Sync>(ctx: &Context<'_, R>, command: AddCommand) -> Result<()> {
    let start_date = parse_datetime(&command.start)?;
    let end_date = match &command.end {
        Some(end) => parse_datetime(end)?,
        None => start_date + Duration::hours(1),
    };

    let data = NewSchedule {
        title: command.title,
        note: command.note,
        color: parse_flag::<Color>(command.color.as_deref())?.unwrap_or(Color::Blue),
        importance: parse_flag::<Importance>(command.importance.as_deref())?.unwrap_or(Importance::Medium),
        tags: command.tag,
        start_date,
        end_date,
        repeat: parse_repeat(&command.repeat)?,
        reminders: command.remind,
    };

    let is_recurring = data.repeat.is_some();
    let schedule = ctx.repo.create_schedule(ctx.owner, data).await?;

    if ctx.json {
        return print_json(&schedule);
    }

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let subtle_style = Style::new().bright_black();

    println!(
        "{} Created {}schedule: {}",
        "✓".style(success_style),
        if is_recurring { "recurring " } else { "" },
        schedule.title.bright_white().bold()
    );
    println!("  {} ID: {}", "→".style(info_style), schedule.id.to_string().yellow());
    println!(
        "  {} When: {}",
        "→".style(info_style),
        format_span(schedule.start_date, schedule.end_date, ctx.tz).cyan()
    );

    if is_recurring {
        println!("\n{} Next steps:", "💡".style(subtle_style));
        println!(
            "   {} See the series: sked show {}",
            "•".style(subtle_style),
            (&schedule.id.to_string()[..SHORT_ID_LEN]).yellow()
        );
        println!(
            "   {} Move one occurrence: sked edit {} --scope only --occurrence <start> --start <new start>",
            "•".style(subtle_style),
            (&schedule.id.to_string()[..SHORT_ID_LEN]).yellow()
        );
    }

    Ok(())
}

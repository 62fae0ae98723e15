use anyhow::Result;
use chrono::{Duration, Utc};
use sked_core::recurrence::QueryWindow;
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::cli::ListCommand;
use crate::parser::parse_datetime;
use crate::views::table::display_occurrences;

pub async fn list_occurrences<R: Repository + Sync>(
    ctx: &Context<'_, R>,
    command: ListCommand,
    default_window_days: u32,
) -> Result<()> {
    let start = match &command.from {
        Some(from) => parse_datetime(from)?,
        None => Utc::now(),
    };
    let end = match &command.to {
        Some(to) => parse_datetime(to)?,
        None => start + Duration::days(i64::from(default_window_days)),
    };
    let window = QueryWindow::new(start, end)?;

    let items = ctx.repo.list_occurrences(ctx.owner, window, &command.tag).await?;
    tracing::debug!(schedules = items.len(), "listed occurrences");

    if ctx.json {
        return print_json(&items);
    }
    display_occurrences(&items, ctx.tz);
    Ok(())
}

use anyhow::Result;
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::cli::ShowCommand;
use crate::util::resolve_schedule_id;
use crate::views::table::display_detail;

pub async fn show_schedule<R: Repository + Sync>(ctx: &Context<'_, R>, command: ShowCommand) -> Result<()> {
    let id = resolve_schedule_id(ctx.repo, ctx.owner, &command.id).await?;
    let detail = ctx.repo.find_schedule_detail(ctx.owner, id).await?;

    if ctx.json {
        return print_json(&detail);
    }
    display_detail(&detail, ctx.tz);
    Ok(())
}

use anyhow::Result;
use sked_core::repository::Repository;

use super::{print_json, Context};
use crate::views::table::display_tags;

pub async fn list_tags<R: Repository + Sync>(ctx: &Context<'_, R>) -> Result<()> {
    let tags = ctx.repo.find_tags(ctx.owner).await?;
    if ctx.json {
        return print_json(&tags);
    }
    display_tags(&tags);
    Ok(())
}

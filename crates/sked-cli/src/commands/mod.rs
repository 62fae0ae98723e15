use chrono_tz::Tz;
use serde::Serialize;
use sked_core::repository::Repository;

pub mod add;
pub mod delete;
pub mod edit;
pub mod list;
pub mod show;
pub mod tags;

/// What every command runs against.
pub struct Context<'a, R: Repository + Sync> {
    pub repo: &'a R,
    pub owner: &'a str,
    pub tz: Tz,
    pub json: bool,
}

/// Pretty-printed JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

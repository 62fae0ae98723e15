use anyhow::{anyhow, Result};
use sked_core::error::CoreError;
use sked_core::repository::Repository;
use uuid::Uuid;

pub const MIN_SHORT_ID_LEN: usize = 4;

/// Accepts a full UUID or a unique prefix of one.
pub async fn resolve_schedule_id(repo: &(impl Repository + Sync), owner_id: &str, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }

    if short_id.len() < MIN_SHORT_ID_LEN {
        return Err(anyhow!(CoreError::InvalidInput(format!(
            "Short ID must be at least {} characters long.",
            MIN_SHORT_ID_LEN
        ))));
    }

    let schedules = repo.find_schedules_by_short_id_prefix(owner_id, short_id).await?;
    if schedules.len() == 1 {
        Ok(schedules[0].id)
    } else if schedules.is_empty() {
        Err(anyhow!(CoreError::ScheduleNotFound(format!(
            "no schedule with ID prefix '{}'",
            short_id
        ))))
    } else {
        let info: Vec<(String, String)> = schedules
            .into_iter()
            .map(|s| (s.id.to_string(), s.title))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(info)))
    }
}

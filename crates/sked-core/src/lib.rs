//! # Sked Core Library
//!
//! Storage and recurrence engine for personal calendar schedules.
//!
//! A schedule is a titled time span owned by one user. It may carry a
//! recurrence rule (daily, weekly, monthly or yearly with a uniform interval,
//! bounded by `until` and/or `count`) and a set of exceptions that suppress
//! single occurrences. Occurrences are never stored; they are expanded on
//! demand for a query window.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`time`]: Normalization of incoming instants to UTC
//! - [`recurrence`]: Occurrence generation and calendar arithmetic
//! - [`modifier`]: Planning of `only` / `after_all` / `all` edits
//! - [`repository`]: Data access layer with Repository pattern
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sked_core::{
//!     db,
//!     models::{Frequency, NewSchedule, RepeatSpec},
//!     recurrence::QueryWindow,
//!     repository::{OccurrenceRepository, ScheduleRepository, SqliteRepository},
//!     time::parse_instant,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sked_core::error::CoreError> {
//!     let pool = db::establish_connection("sked.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!
//!     let mut standup = NewSchedule::new(
//!         "Standup",
//!         parse_instant("2024-01-01T10:00:00Z")?,
//!         parse_instant("2024-01-01T10:15:00Z")?,
//!     );
//!     standup.repeat = Some(RepeatSpec::new(Frequency::Weekly));
//!     repo.create_schedule("me", standup).await?;
//!
//!     let window = QueryWindow::new(
//!         parse_instant("2024-01-01")?,
//!         parse_instant("2024-01-31")?,
//!     )?;
//!     for item in repo.list_occurrences("me", window, &[]).await? {
//!         println!("{}: {} occurrences", item.title, item.dates.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod modifier;
pub mod recurrence;
pub mod repository;
pub mod time;

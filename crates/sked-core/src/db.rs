use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;

pub use sqlx::SqlitePool as DbPool;

const MEMORY_URL: &str = "sqlite::memory:";

/// Opens a connection pool to the SQLite database at `db_path` and runs the
/// migrations.
///
/// The file and its parent directories are created when missing. Passing
/// `sqlite::memory:` gives a private in-memory database.
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    let in_memory = db_path == MEMORY_URL || db_path == ":memory:";

    let options = if in_memory {
        SqliteConnectOptions::from_str(MEMORY_URL)?
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
    }
    .foreign_keys(true);

    // Every in-memory connection is its own database, so keep exactly one.
    let max_connections = if in_memory { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(db_path, "database ready");
    Ok(pool)
}

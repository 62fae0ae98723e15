use clap::Parser;
use owo_colors::{OwoColorize, Style};
use sked_core::db;
use sked_core::error::CoreError;
use sked_core::repository::SqliteRepository;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use commands::Context;
use timezone::display_timezone;

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter_layer, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("warn")));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let cli = cli::Cli::parse();
    let config = config::Config::load_or_default();
    tracing::debug!(config = ?config, "configuration loaded");

    // RUST_LOG wins over the configured level.
    if !from_env {
        match EnvFilter::try_new(config.log_level.as_str()) {
            Ok(filter) => {
                if let Err(e) = filter_handle.modify(|current| *current = filter) {
                    tracing::warn!(error = %e, "failed to update log filter from config");
                }
            }
            Err(_) => tracing::warn!(level = %config.log_level, "invalid log level in config, keeping warn"),
        }
    }

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = ?e, path = %config.database_path, "failed to open database");
            std::process::exit(handle_error(e.into()));
        }
    };
    let repository = SqliteRepository::new(db_pool);

    let owner = cli.owner.clone().unwrap_or_else(|| config.owner.clone());
    let ctx = Context {
        repo: &repository,
        owner: &owner,
        tz: display_timezone(&config.timezone),
        json: cli.json,
    };

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_schedule(&ctx, command).await,
        cli::Commands::List(command) => {
            commands::list::list_occurrences(&ctx, command, config.default_window_days).await
        }
        cli::Commands::Show(command) => commands::show::show_schedule(&ctx, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_schedule(&ctx, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_schedule(&ctx, command).await,
        cli::Commands::Tags => commands::tags::list_tags(&ctx).await,
    };

    if let Err(e) = result {
        std::process::exit(handle_error(e));
    }
}

/// Prints the error and returns the process exit code: 2 for requests that
/// were rejected as invalid, 1 for everything else.
fn handle_error(err: anyhow::Error) -> i32 {
    let error_style = Style::new().red().bold();

    let Some(core_error) = err.downcast_ref::<CoreError>() else {
        eprintln!("{} {}", "Error:".style(error_style), err);
        return 1;
    };

    match core_error {
        CoreError::AmbiguousId(schedules) => {
            eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
            eprintln!("Did you mean one of these?");
            for (id, title) in schedules {
                eprintln!("  {} ({})", id.yellow(), title);
            }
        }
        CoreError::StorageFailure(_) | CoreError::Migration(_) | CoreError::Io(_) => {
            tracing::error!(error = ?core_error, "storage error");
            eprintln!("{} {}", "Error:".style(error_style), core_error.user_message());
        }
        other => eprintln!("{} {}", "Error:".style(error_style), other.user_message()),
    }

    if core_error.is_client_error() {
        2
    } else {
        1
    }
}

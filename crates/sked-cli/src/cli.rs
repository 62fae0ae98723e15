use clap::{Args, Parser, Subcommand};

/// A calendar for recurring personal schedules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act on behalf of this owner instead of the configured one
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new schedule
    Add(AddCommand),
    /// List occurrences inside a time window
    List(ListCommand),
    /// Show one schedule with its rule, exceptions, tags and reminders
    Show(ShowCommand),
    /// Edit a schedule or part of its series
    Edit(EditCommand),
    /// Delete a schedule
    Delete(DeleteCommand),
    /// List your tags
    Tags,
}

/// Recurrence flags shared by `add` and `edit`
#[derive(Args, Debug, Clone, Default)]
pub struct RepeatArgs {
    /// Repeat frequency (daily, weekly, monthly, yearly)
    #[arg(long)]
    pub every: Option<String>,
    /// Cycles between occurrences
    #[arg(long, requires = "every", allow_negative_numbers = true)]
    pub interval: Option<i64>,
    /// Last instant an occurrence may start at
    #[arg(long, requires = "every")]
    pub until: Option<String>,
    /// Maximum number of cycles
    #[arg(long, requires = "every", allow_negative_numbers = true)]
    pub count: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the schedule
    pub title: String,
    /// Start instant (ISO 8601 or natural language like "tomorrow 10am")
    #[arg(short, long)]
    pub start: String,
    /// End instant; defaults to one hour after the start
    #[arg(short, long)]
    pub end: Option<String>,
    /// One of blue, green, yellow, purple, orange, mint, lavender, beige, coral
    #[arg(short, long)]
    pub color: Option<String>,
    /// One of very_low, low, medium, high, very_high
    #[arg(short, long)]
    pub importance: Option<String>,
    #[arg(short, long)]
    pub note: Option<String>,
    /// Tags to attach
    #[arg(short, long, num_args = 1..)]
    pub tag: Vec<String>,
    #[command(flatten)]
    pub repeat: RepeatArgs,
    /// Reminder offsets in minutes before the start
    #[arg(long, num_args = 1..)]
    pub remind: Vec<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Window start; defaults to now
    #[arg(long)]
    pub from: Option<String>,
    /// Window end; defaults to the configured number of days after the start
    #[arg(long)]
    pub to: Option<String>,
    /// Only schedules carrying one of these tags
    #[arg(short, long, num_args = 1..)]
    pub tag: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// Schedule ID or a unique prefix of it
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// Schedule ID or a unique prefix of it
    pub id: String,

    /// Which part of the series to change: only, after_all or all
    #[arg(long)]
    pub scope: Option<String>,

    /// Start of the occurrence being detached; only valid with --scope only
    #[arg(long)]
    pub occurrence: Option<String>,

    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub importance: Option<String>,

    /// Replace the tags
    #[arg(long, num_args = 1..)]
    pub tag: Option<Vec<String>>,

    #[command(flatten)]
    pub repeat: RepeatArgs,

    /// Replace the reminders
    #[arg(long, num_args = 1..)]
    pub remind: Option<Vec<i64>>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// Schedule ID or a unique prefix of it
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use kanban_domain::{CardPriority, ReminderType};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Kanban ordering and reminder engine", long_about = None)]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")")
)]
pub struct Cli {
    /// Path to kanban data file (or set KANBAN_FILE env var)
    #[arg(long, short = 'f', value_name = "FILE", env = "KANBAN_FILE", global = true)]
    pub file: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Board operations
    Board(BoardCommand),
    /// List operations
    List(ListCommand),
    /// Card operations
    Card(CardCommand),
    /// Reminder operations
    Reminder(ReminderCommand),
    /// Claim due reminders once and print the events they produce
    Scan {
        /// Treat this instant as "now" (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Board commands
#[derive(Args)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Create a new board
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        organization_id: Option<Uuid>,
    },
    /// Show a board with its lists and cards in order
    Show {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete a board and everything on it
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

// List commands
#[derive(Args)]
pub struct ListCommand {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Append a new list to a board
    Create {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Move a list to a position on its board
    Move {
        #[arg(long)]
        id: Uuid,
        /// Zero-based target position; past the end appends
        #[arg(long, allow_negative_numbers = true)]
        index: i64,
        /// Board the list should end up on (must be its current board)
        #[arg(long)]
        board_id: Option<Uuid>,
    },
    /// Set the complete order of a board's lists
    Reorder {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<Uuid>,
    },
    /// Delete a list and its cards
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

// Card commands
#[derive(Args)]
pub struct CardCommand {
    #[command(subcommand)]
    pub action: CardAction,
}

#[derive(Subcommand)]
pub enum CardAction {
    /// Append a new card to a list
    Create {
        #[arg(long)]
        list_id: Uuid,
        #[arg(long)]
        title: String,
        /// Due date (RFC 3339)
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<CardPriority>,
    },
    /// Move a card within its list or into another list
    Move {
        #[arg(long)]
        id: Uuid,
        /// Zero-based target position; past the end appends
        #[arg(long, allow_negative_numbers = true)]
        index: i64,
        /// Destination list; defaults to the card's current list
        #[arg(long)]
        list_id: Option<Uuid>,
    },
    /// Set the complete order of a list's cards
    Reorder {
        #[arg(long)]
        list_id: Uuid,
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<Uuid>,
    },
    /// Delete a card and its reminders
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

// Reminder commands
#[derive(Args)]
pub struct ReminderCommand {
    #[command(subcommand)]
    pub action: ReminderAction,
}

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Schedule a reminder for a card
    Add {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        user_id: Uuid,
        /// When the reminder fires (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,
        /// Label shown to the user: 24h, 1h or custom
        #[arg(long = "type", default_value = "custom")]
        reminder_type: ReminderType,
    },
    /// List reminders for a card
    List {
        #[arg(long)]
        card_id: Uuid,
    },
    /// Cancel a scheduled reminder
    Cancel {
        #[arg(long)]
        id: Uuid,
    },
}

fn parse_priority(value: &str) -> Result<CardPriority, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase())).map_err(|_| {
        format!(
            "unknown priority '{}' (expected low, medium, high or critical)",
            value
        )
    })
}

mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use kanban_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("KANBAN_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::output_error(&e.to_string());
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "kanban", &mut std::io::stdout());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(std::path::Path::new(path))?.with_env_overrides(),
        None => AppConfig::load(),
    };
    let file_path = cli
        .file
        .ok_or_else(|| anyhow::anyhow!("--file is required for CLI operations"))?;
    let mut ctx = CliContext::load(&file_path, config).await?;

    match cli.command {
        Commands::Board(board_cmd) => handlers::board::handle(&mut ctx, board_cmd.action).await,
        Commands::List(list_cmd) => handlers::list::handle(&mut ctx, list_cmd.action).await,
        Commands::Card(card_cmd) => handlers::card::handle(&mut ctx, card_cmd.action).await,
        Commands::Reminder(reminder_cmd) => {
            handlers::reminder::handle(&mut ctx, reminder_cmd.action).await
        }
        Commands::Scan { now } => handlers::scan::handle(&mut ctx, now).await,
        Commands::Completions { .. } => Ok(()),
    }
}

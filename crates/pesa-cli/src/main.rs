//! Pesa CLI - Personal finance advisor
//!
//! Usage:
//!   pesa init                      Initialize database
//!   pesa add 42.50 -c groceries    Record an expense
//!   pesa advice                    Get advice for this month
//!   pesa alerts generate           Run the alert rules
//!   pesa serve --port 3000         Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let open = || commands::open_db(&cli.db, cli.no_encrypt);
    let user = cli.user.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Add {
            amount,
            tx_type,
            category,
            description,
            date,
            counterparty,
        } => commands::cmd_add(
            &open()?,
            user,
            commands::NewEntry {
                amount,
                tx_type,
                category,
                description,
                date,
                counterparty,
            },
        ),
        Commands::Transactions { limit } => commands::cmd_transactions_list(&open()?, user, limit),
        Commands::Profile { period } => commands::cmd_profile(&open()?, user, period),
        Commands::Advice { period, json } => {
            commands::cmd_advice(&open()?, user, period, json).await
        }
        Commands::Insights { file, goal, json } => commands::cmd_insights(user, &file, goal, json),
        Commands::Alerts { action, unread } => {
            let db = open()?;
            match action {
                None => commands::cmd_alerts_list(&db, user, unread),
                Some(AlertCommands::Generate) => commands::cmd_alerts_generate(&db, user),
                Some(AlertCommands::Read { id }) => commands::cmd_alerts_read(&db, id),
                Some(AlertCommands::Explain { id }) => {
                    commands::cmd_alerts_explain(&db, user, id).await
                }
            }
        }
        Commands::Health => commands::cmd_health(&open()?, user),
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => commands::cmd_serve(&cli.db, &host, port, allowed_origins, cli.no_encrypt).await,
    }
}

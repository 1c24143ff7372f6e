//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pesa_core::{PeriodKey, TransactionType};
use rust_decimal::Decimal;

/// Pesa - Personal finance advice that stays fresh
#[derive(Parser)]
#[command(name = "pesa")]
#[command(about = "Self-hosted personal finance advisor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "pesa.db", global = true)]
    pub db: PathBuf,

    /// User the command acts on
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set PESA_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record a transaction
    Add {
        /// Amount (non-negative)
        amount: Decimal,

        /// Transaction type: income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        tx_type: TransactionType,

        /// Category (e.g. groceries, rent, salary)
        #[arg(short, long, default_value = "uncategorized")]
        category: String,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Transaction date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Merchant or payer
        #[arg(long)]
        counterparty: Option<String>,
    },

    /// List recent transactions
    Transactions {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Aggregate and show the financial profile for a month
    Profile {
        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        period: Option<PeriodKey>,
    },

    /// Get advice, reusing the cached text while it is still fresh
    Advice {
        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        period: Option<PeriodKey>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Contextual insights over a JSON file of transaction records
    Insights {
        /// JSON array of transaction records
        #[arg(short, long)]
        file: PathBuf,

        /// Savings goal for the projection
        #[arg(short, long)]
        goal: Option<Decimal>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Alert commands
    Alerts {
        #[command(subcommand)]
        action: Option<AlertCommands>,

        /// Show only unread alerts
        #[arg(long)]
        unread: bool,
    },

    /// Show the financial health score for recent months
    Health,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Additional allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AlertCommands {
    /// Run the alert rules for the current month
    Generate,

    /// Mark an alert as read
    Read {
        /// Alert ID
        id: i64,
    },

    /// Explain an alert using recent transactions
    Explain {
        /// Alert ID
        id: i64,
    },
}

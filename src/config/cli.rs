use crate::domain::model::{DrawResult, TicketStatus};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sorteo")]
#[command(about = "Ticket allocation and draw results for the quarterly sweepstakes")]
pub struct CliConfig {
    /// Path to the TOML file holding rules, clients and draws
    #[arg(short, long, default_value = "sorteo.toml", global = true)]
    pub config: String,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Find a client by CUIT or DNI and show its tickets
    Lookup { identifier: String },

    /// Show a client's progress toward its next ticket
    Progress { identifier: String },

    /// List tickets, for one client or for the whole program
    Tickets {
        /// CUIT or DNI of the client
        #[arg(long)]
        client: Option<String>,

        /// Only tickets in this state (active or consumed)
        #[arg(long)]
        status: Option<TicketStatus>,
    },

    /// Search clients by name, CUIT or DNI
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// List the tier rules
    Rules,

    /// List every draw with its prizes and results
    Draws,

    /// Program-wide counters
    Summary,

    /// Record an invoice for a client and issue the tickets it earns
    Bill {
        identifier: String,
        amount: Decimal,

        /// Write the updated state back to the config file
        #[arg(long)]
        save: bool,
    },

    /// Complete an upcoming draw with its winning tickets
    Finalize {
        draw_id: String,

        /// Winning ticket as <number>:<prize-id>:<client name>; repeat once per prize
        #[arg(long = "result", required = true)]
        results: Vec<DrawResult>,

        /// Write the updated state back to the config file
        #[arg(long)]
        save: bool,
    },

    /// Write the full ticket listing as CSV
    Export { output: PathBuf },
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("config", &self.config)?;
        match &self.command {
            Command::Lookup { identifier }
            | Command::Progress { identifier }
            | Command::Bill { identifier, .. } => validate_non_empty_string("identifier", identifier),
            Command::Finalize { draw_id, .. } => validate_non_empty_string("draw_id", draw_id),
            _ => Ok(()),
        }
    }
}

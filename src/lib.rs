//! Ticket allocation and draw consumption for a quarterly corporate sweepstakes.
//!
//! Clients earn numbered tickets from their cumulative billing according to
//! their tier's threshold. Tickets stay active until they win a draw, at which
//! point they are consumed for good.
//!
//! [`SorteoEngine`] is the entry point; it is built from a [`SorteoConfig`].

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::SorteoConfig;
pub use core::{draw::DrawPolicy, engine::SorteoEngine};
pub use domain::model::{
    CategoryRule, Client, Draw, DrawResult, DrawStatus, Prize, ProgramSummary, Progress, Ticket,
    TicketListing, TicketStatus, TierId,
};
pub use utils::error::{SorteoError, Result};

pub mod allocation;
pub mod draw;
pub mod engine;
pub mod export;
pub mod ledger;
pub mod lookup;
pub mod rules;

pub use crate::domain::model::{
    CategoryRule, Client, Consumption, Draw, DrawResult, DrawStatus, Prize, ProgramSummary,
    Progress, Ticket, TicketListing, TicketStatus, TierId,
};
pub use crate::domain::ports::{Clock, NumberAllocator};
pub use crate::utils::error::Result;

use crate::core::{TicketListing, TierId};
use crate::utils::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct TicketRow<'a> {
    number: u32,
    ticket_id: &'a str,
    client_id: &'a str,
    client_name: &'a str,
    category: TierId,
    status: String,
    assigned_at: NaiveDate,
    consumed_at: Option<NaiveDate>,
    draw_id: Option<&'a str>,
    prize_name: Option<&'a str>,
}

impl<'a> From<&'a TicketListing> for TicketRow<'a> {
    fn from(row: &'a TicketListing) -> Self {
        let ticket = &row.ticket;
        Self {
            number: ticket.number(),
            ticket_id: ticket.id(),
            client_id: ticket.client_id(),
            client_name: &row.client_name,
            category: row.category,
            status: ticket.status().to_string(),
            assigned_at: ticket.assigned_at(),
            consumed_at: ticket.consumed_at(),
            draw_id: ticket.draw_id(),
            prize_name: ticket.prize_name(),
        }
    }
}

/// 將號碼清單寫出為 CSV
pub fn write_tickets_csv<W: Write>(writer: W, rows: &[TicketListing]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(TicketRow::from(row))?;
    }
    csv_writer.flush()?;

    tracing::debug!("Exported {} ticket rows", rows.len());
    Ok(rows.len())
}

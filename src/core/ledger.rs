use crate::core::allocation::{client_tickets_earned, tickets_earned};
use crate::core::rules::CategoryRuleTable;
use crate::core::{Client, Clock, Consumption, NumberAllocator, Ticket, TicketListing, TicketStatus};
use crate::utils::error::{Result, SorteoError};
use crate::utils::validation::validate_positive_amount;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

impl Client {
    /// Tickets still eligible for draws, ascending by number.
    pub fn active_tickets(&self) -> Vec<&Ticket> {
        self.tickets_with_status(TicketStatus::Active)
    }

    /// Tickets that already won a prize, ascending by number.
    pub fn consumed_tickets(&self) -> Vec<&Ticket> {
        self.tickets_with_status(TicketStatus::Consumed)
    }

    pub fn issued_count(&self) -> usize {
        self.tickets().len()
    }

    fn tickets_with_status(&self, status: TicketStatus) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self
            .tickets()
            .iter()
            .filter(|t| t.status() == status)
            .collect();
        tickets.sort_by_key(|t| t.number());
        tickets
    }
}

/// Owns every client and their tickets, plus the global number index.
pub struct TicketLedger {
    clients: Vec<Client>,
    by_id: HashMap<String, usize>,
    // ticket number -> (client index, ticket index)
    numbers: HashMap<u32, (usize, usize)>,
    allocator: Box<dyn NumberAllocator>,
    clock: Box<dyn Clock>,
    next_ticket_seq: u64,
}

impl TicketLedger {
    pub fn new(
        clients: Vec<Client>,
        allocator: Box<dyn NumberAllocator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(clients.len());
        let mut numbers = HashMap::new();
        let mut next_ticket_seq = 1;

        for (client_idx, client) in clients.iter().enumerate() {
            if by_id.insert(client.id().to_string(), client_idx).is_some() {
                return Err(SorteoError::ConfigValidationError {
                    field: "clients.id".to_string(),
                    message: format!("client id '{}' is used more than once", client.id()),
                });
            }

            for (ticket_idx, ticket) in client.tickets().iter().enumerate() {
                if numbers.insert(ticket.number(), (client_idx, ticket_idx)).is_some() {
                    return Err(SorteoError::DuplicateNumber {
                        number: ticket.number(),
                        client_id: client.id().to_string(),
                    });
                }
                if let Some(seq) = ticket_sequence(ticket.id()) {
                    let next = seq.checked_add(1).ok_or_else(|| SorteoError::ConfigValidationError {
                        field: "clients.tickets.id".to_string(),
                        message: format!("ticket id '{}' leaves no room for new ids", ticket.id()),
                    })?;
                    next_ticket_seq = next_ticket_seq.max(next);
                }
            }
        }

        tracing::debug!(
            "Ledger loaded: {} clients, {} tickets",
            clients.len(),
            numbers.len()
        );

        Ok(Self {
            clients,
            by_id,
            numbers,
            allocator,
            clock,
            next_ticket_seq,
        })
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.by_id.get(client_id).map(|&idx| &self.clients[idx])
    }

    pub fn ticket_count(&self) -> usize {
        self.numbers.len()
    }

    pub fn highest_number(&self) -> Option<u32> {
        self.numbers.keys().copied().max()
    }

    /// 依號碼查找號碼及其持有人
    pub fn locate(&self, number: u32) -> Option<(&Client, &Ticket)> {
        self.numbers.get(&number).map(|&(client_idx, ticket_idx)| {
            let client = &self.clients[client_idx];
            (client, &client.tickets()[ticket_idx])
        })
    }

    /// 補發客戶已達門檻但尚未取得的號碼
    pub fn issue_tickets_if_due(
        &mut self,
        rules: &CategoryRuleTable,
        client_id: &str,
    ) -> Result<Vec<Ticket>> {
        let client_idx = self.index_of(client_id)?;
        let earned = client_tickets_earned(rules, &self.clients[client_idx])?;
        let minted = self.mint(client_idx, earned)?;
        self.commit(client_idx, &minted);
        Ok(minted)
    }

    /// 記錄一筆發票金額並發放對應號碼
    ///
    /// 發放失敗時客戶資料不變
    pub fn record_billing(
        &mut self,
        rules: &CategoryRuleTable,
        client_id: &str,
        amount: Decimal,
    ) -> Result<Vec<Ticket>> {
        validate_positive_amount("amount", amount)?;
        let client_idx = self.index_of(client_id)?;

        let client = &self.clients[client_idx];
        let rule = rules.require(client.category())?;
        let new_total = client.total_billed().checked_add(amount).ok_or_else(|| {
            SorteoError::ValidationError {
                message: format!(
                    "amount {} would overflow client {}'s billed total",
                    amount,
                    client.id()
                ),
            }
        })?;
        let earned = tickets_earned(new_total, rule.threshold_usd)?;

        let minted = self.mint(client_idx, earned)?;

        let client = &mut self.clients[client_idx];
        client.add_billing(amount);
        tracing::info!(
            "🧾 Billing of USD {} recorded for client {} (total USD {})",
            amount,
            client.id(),
            client.total_billed()
        );
        self.commit(client_idx, &minted);

        Ok(minted)
    }

    /// 全部號碼，依號碼排序
    pub fn listing(&self, status: Option<TicketStatus>) -> Vec<TicketListing> {
        let mut rows: Vec<TicketListing> = self
            .clients
            .iter()
            .flat_map(|client| {
                client
                    .tickets()
                    .iter()
                    .filter(move |t| status.map_or(true, |s| t.status() == s))
                    .map(move |ticket| TicketListing {
                        client_name: client.name().to_string(),
                        category: client.category(),
                        ticket: ticket.clone(),
                    })
            })
            .collect();
        rows.sort_by_key(|row| row.ticket.number());
        rows
    }

    pub(crate) fn consume(&mut self, number: u32, consumption: Consumption) {
        if let Some(&(client_idx, ticket_idx)) = self.numbers.get(&number) {
            self.clients[client_idx].tickets_mut()[ticket_idx].consume(consumption);
        }
    }

    fn index_of(&self, client_id: &str) -> Result<usize> {
        self.by_id
            .get(client_id)
            .copied()
            .ok_or_else(|| SorteoError::ClientNotFound {
                identifier: client_id.to_string(),
            })
    }

    /// Builds, without attaching them, the tickets needed to bring the client up to `earned`.
    fn mint(&mut self, client_idx: usize, earned: u32) -> Result<Vec<Ticket>> {
        let client = &self.clients[client_idx];
        let issued = client.issued_count();
        let earned = earned as usize;

        if issued > earned {
            tracing::warn!(
                "⚠️ Client {} holds {} tickets but has only earned {}",
                client.id(),
                issued,
                earned
            );
            return Ok(Vec::new());
        }

        let due = earned - issued;
        if due == 0 {
            return Ok(Vec::new());
        }

        // 新編號與下一個序號都須在 u64 範圍內
        if self.next_ticket_seq.checked_add(due as u64).is_none() {
            return Err(SorteoError::ValidationError {
                message: format!("no ticket ids left for {} new ticket(s)", due),
            });
        }

        let client_id = client.id().to_string();
        let today = self.clock.today();
        let mut seen = HashSet::with_capacity(due);
        let mut minted = Vec::with_capacity(due);

        for offset in 0..due {
            let number = self.allocator.next_number()?;
            if self.numbers.contains_key(&number) || !seen.insert(number) {
                tracing::error!("❌ Number allocator produced duplicate ticket number {}", number);
                return Err(SorteoError::DuplicateNumber {
                    number,
                    client_id,
                });
            }
            let id = format!("n{}", self.next_ticket_seq + offset as u64);
            minted.push(Ticket::new_active(id, number, client_id.clone(), today));
        }

        Ok(minted)
    }

    fn commit(&mut self, client_idx: usize, minted: &[Ticket]) {
        if minted.is_empty() {
            return;
        }

        let client = &mut self.clients[client_idx];
        for ticket in minted {
            let ticket_idx = client.tickets().len();
            client.tickets_mut().push(ticket.clone());
            self.numbers.insert(ticket.number(), (client_idx, ticket_idx));
        }
        self.next_ticket_seq += minted.len() as u64;

        tracing::info!(
            "🎟️ Issued {} ticket(s) to client {}: {:?}",
            minted.len(),
            client.id(),
            minted.iter().map(Ticket::number).collect::<Vec<_>>()
        );
    }
}

fn ticket_sequence(ticket_id: &str) -> Option<u64> {
    ticket_id.strip_prefix('n')?.parse().ok()
}

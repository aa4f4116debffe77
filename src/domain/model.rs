use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client tier. Determines how much billing earns one ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TierId {
    Diamante,
    Oro,
    Plata,
    Gremio,
}

impl TierId {
    pub const ALL: [TierId; 4] = [TierId::Diamante, TierId::Oro, TierId::Plata, TierId::Gremio];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierId::Diamante => "DIAMANTE",
            TierId::Oro => "ORO",
            TierId::Plata => "PLATA",
            TierId::Gremio => "GREMIO",
        }
    }

    /// 顯示名稱
    pub fn label(&self) -> &'static str {
        match self {
            TierId::Diamante => "Diamante",
            TierId::Oro => "Oro",
            TierId::Plata => "Plata",
            TierId::Gremio => "Gremio",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TierId::Diamante => "accent",
            TierId::Oro => "gold",
            TierId::Plata => "muted",
            TierId::Gremio => "primary",
        }
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TierId::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tier '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: TierId,
    pub threshold_usd: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Consumed,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Active => f.write_str("active"),
            TicketStatus::Consumed => f.write_str("consumed"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TicketStatus::Active),
            "consumed" => Ok(TicketStatus::Consumed),
            other => Err(format!("unknown ticket status '{}'", other)),
        }
    }
}

/// Set on a ticket when it wins a draw. The three fields only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consumption {
    pub consumed_at: NaiveDate,
    pub draw_id: String,
    pub prize_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    id: String,
    number: u32,
    client_id: String,
    status: TicketStatus,
    assigned_at: NaiveDate,
    #[serde(flatten)]
    consumption: Option<Consumption>,
}

impl Ticket {
    pub fn new_active(id: String, number: u32, client_id: String, assigned_at: NaiveDate) -> Self {
        Self {
            id,
            number,
            client_id,
            status: TicketStatus::Active,
            assigned_at,
            consumption: None,
        }
    }

    pub fn new_consumed(
        id: String,
        number: u32,
        client_id: String,
        assigned_at: NaiveDate,
        consumption: Consumption,
    ) -> Self {
        Self {
            id,
            number,
            client_id,
            status: TicketStatus::Consumed,
            assigned_at,
            consumption: Some(consumption),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Active
    }

    pub fn assigned_at(&self) -> NaiveDate {
        self.assigned_at
    }

    pub fn consumption(&self) -> Option<&Consumption> {
        self.consumption.as_ref()
    }

    pub fn consumed_at(&self) -> Option<NaiveDate> {
        self.consumption.as_ref().map(|c| c.consumed_at)
    }

    pub fn draw_id(&self) -> Option<&str> {
        self.consumption.as_ref().map(|c| c.draw_id.as_str())
    }

    pub fn prize_name(&self) -> Option<&str> {
        self.consumption.as_ref().map(|c| c.prize_name.as_str())
    }

    /// Only the draw resolver calls this, after validating the ticket is still active.
    pub(crate) fn consume(&mut self, consumption: Consumption) {
        debug_assert!(self.is_active(), "ticket {} consumed twice", self.number);
        self.status = TicketStatus::Consumed;
        self.consumption = Some(consumption);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    id: String,
    name: String,
    tax_id: String,
    national_id: String,
    category: TierId,
    total_billed: Decimal,
    tickets: Vec<Ticket>,
}

impl Client {
    pub fn new(id: String, name: String, tax_id: String, national_id: String, category: TierId) -> Self {
        Self {
            id,
            name,
            tax_id,
            national_id,
            category,
            total_billed: Decimal::ZERO,
            tickets: Vec::new(),
        }
    }

    /// 從已驗證的配置資料重建客戶
    pub(crate) fn from_parts(
        id: String,
        name: String,
        tax_id: String,
        national_id: String,
        category: TierId,
        total_billed: Decimal,
        tickets: Vec<Ticket>,
    ) -> Self {
        Self {
            id,
            name,
            tax_id,
            national_id,
            category,
            total_billed,
            tickets,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    pub fn category(&self) -> TierId {
        self.category
    }

    pub fn total_billed(&self) -> Decimal {
        self.total_billed
    }

    /// 所有已發放號碼，依發放順序
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub(crate) fn tickets_mut(&mut self) -> &mut Vec<Ticket> {
        &mut self.tickets
    }

    pub(crate) fn add_billing(&mut self, amount: Decimal) {
        debug_assert!(amount > Decimal::ZERO);
        self.total_billed += amount;
    }

    pub fn with_total_billed(mut self, total_billed: Decimal) -> Self {
        self.total_billed = total_billed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    Upcoming,
    Completed,
}

impl fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawStatus::Upcoming => f.write_str("upcoming"),
            DrawStatus::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub id: String,
    pub name: String,
    pub description: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub ticket_number: u32,
    pub prize_id: String,
    pub client_name: String,
}

impl DrawResult {
    pub fn new(ticket_number: u32, prize_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            ticket_number,
            prize_id: prize_id.into(),
            client_name: client_name.into(),
        }
    }
}

impl FromStr for DrawResult {
    type Err = String;

    /// Parses `<number>:<prize-id>:<client name>`. The client name may itself contain colons.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let number = parts.next().unwrap_or_default().trim();
        let prize_id = parts.next().map(str::trim).unwrap_or_default();
        let client_name = parts.next().map(str::trim).unwrap_or_default();

        let ticket_number = number
            .parse::<u32>()
            .map_err(|_| format!("'{}' is not a ticket number", number))?;
        if prize_id.is_empty() || client_name.is_empty() {
            return Err(format!(
                "expected <number>:<prize-id>:<client name>, got '{}'",
                s
            ));
        }

        Ok(DrawResult::new(ticket_number, prize_id, client_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draw {
    id: String,
    name: String,
    date: NaiveDate,
    status: DrawStatus,
    prizes: Vec<Prize>,
    results: Vec<DrawResult>,
}

impl Draw {
    pub fn upcoming(id: String, name: String, date: NaiveDate, prizes: Vec<Prize>) -> Self {
        Self {
            id,
            name,
            date,
            status: DrawStatus::Upcoming,
            prizes,
            results: Vec::new(),
        }
    }

    /// Rebuilds a completed draw from seed data whose results are historical.
    pub(crate) fn completed(
        id: String,
        name: String,
        date: NaiveDate,
        prizes: Vec<Prize>,
        results: Vec<DrawResult>,
    ) -> Self {
        Self {
            id,
            name,
            date,
            status: DrawStatus::Completed,
            prizes,
            results,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn status(&self) -> DrawStatus {
        self.status
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    pub fn results(&self) -> &[DrawResult] {
        &self.results
    }

    pub fn prize(&self, prize_id: &str) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == prize_id)
    }

    pub(crate) fn complete(&mut self, results: Vec<DrawResult>) {
        debug_assert_eq!(self.status, DrawStatus::Upcoming);
        self.results = results;
        self.status = DrawStatus::Completed;
    }
}

/// Progress toward a client's next ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current_residual: Decimal,
    pub threshold: Decimal,
    pub percentage: Decimal,
    pub tickets_earned: u32,
    pub remaining_to_next: Decimal,
}

/// One row of the operator-wide ticket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketListing {
    pub client_name: String,
    pub category: TierId,
    #[serde(flatten)]
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramSummary {
    pub program_name: String,
    pub clients: usize,
    pub active_tickets: usize,
    pub consumed_tickets: usize,
    pub completed_draws: usize,
    pub next_draw: Option<String>,
}

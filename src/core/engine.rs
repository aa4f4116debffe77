use crate::adapters::{SequentialAllocator, SystemClock};
use crate::config::toml_config::{ClientSeed, DrawSeed, LookupConfig, ProgramConfig, SorteoConfig};
use crate::core::allocation;
use crate::core::draw::{DrawBook, DrawPolicy};
use crate::core::ledger::TicketLedger;
use crate::core::lookup::{search_clients, IdentifierIndex};
use crate::core::rules::CategoryRuleTable;
use crate::core::{
    CategoryRule, Client, Clock, Draw, DrawResult, DrawStatus, NumberAllocator, ProgramSummary,
    Progress, Ticket, TicketListing, TicketStatus, TierId,
};
use crate::utils::error::{Result, SorteoError};
use crate::utils::validation::Validate;
use rust_decimal::Decimal;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct EngineState {
    ledger: TicketLedger,
    draws: DrawBook,
    index: IdentifierIndex,
}

/// 抽獎程式的進入點
///
/// All mutable state sits behind one lock. Each write holds it exclusively from
/// its first check to its last change, so readers never see half of a draw.
pub struct SorteoEngine {
    program: ProgramConfig,
    lookup: LookupConfig,
    policy: DrawPolicy,
    rules: CategoryRuleTable,
    state: RwLock<EngineState>,
}

impl SorteoEngine {
    /// 從配置建立引擎 (使用系統時鐘)
    pub fn from_config(config: &SorteoConfig) -> Result<Self> {
        Self::from_config_with_clock(config, Box::new(SystemClock))
    }

    pub fn from_config_with_clock(config: &SorteoConfig, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let clients = config.build_clients()?;
        let highest = clients
            .iter()
            .flat_map(|c| c.tickets().iter().map(Ticket::number))
            .max();
        let allocator =
            SequentialAllocator::after(highest, config.program.first_ticket_number);

        Self::new(
            config.program.clone(),
            config.lookup,
            config.draw_policy,
            config.rule_table()?,
            clients,
            config.build_draws()?,
            Box::new(allocator),
            clock,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        program: ProgramConfig,
        lookup: LookupConfig,
        policy: DrawPolicy,
        rules: CategoryRuleTable,
        clients: Vec<Client>,
        draws: Vec<Draw>,
        allocator: Box<dyn NumberAllocator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let index = IdentifierIndex::build(&clients, lookup.normalize_identifiers)?;
        let ledger = TicketLedger::new(clients, allocator, clock)?;
        let draws = DrawBook::new(draws)?;

        tracing::info!(
            "🚀 Engine ready for '{}': {} rules, {} clients, {} tickets, {} draws",
            program.name,
            rules.len(),
            ledger.clients().len(),
            ledger.ticket_count(),
            draws.draws().len()
        );

        Ok(Self {
            program,
            lookup,
            policy,
            rules,
            state: RwLock::new(EngineState {
                ledger,
                draws,
                index,
            }),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state.read().map_err(|_| SorteoError::StatePoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state.write().map_err(|_| SorteoError::StatePoisoned)
    }

    pub fn program_name(&self) -> &str {
        &self.program.name
    }

    pub fn draw_policy(&self) -> &DrawPolicy {
        &self.policy
    }

    pub fn rules(&self) -> Vec<CategoryRule> {
        self.rules.rules().into_iter().cloned().collect()
    }

    pub fn rule_for(&self, tier: TierId) -> Option<CategoryRule> {
        self.rules.rule_for(tier).cloned()
    }

    /// 以 CUIT 或 DNI 查找客戶
    pub fn find_client(&self, identifier: &str) -> Result<Client> {
        let state = self.read()?;
        let found = state
            .index
            .find(identifier)
            .and_then(|client_id| state.ledger.client(client_id));

        match found {
            Some(client) => {
                tracing::debug!("🔍 Identifier resolved to client {}", client.id());
                Ok(client.clone())
            }
            None => {
                tracing::debug!("🔍 No client matches the given identifier");
                Err(SorteoError::ClientNotFound {
                    identifier: identifier.to_string(),
                })
            }
        }
    }

    pub fn client(&self, client_id: &str) -> Result<Client> {
        self.read()?
            .ledger
            .client(client_id)
            .cloned()
            .ok_or_else(|| SorteoError::ClientNotFound {
                identifier: client_id.to_string(),
            })
    }

    pub fn search_clients(&self, query: &str) -> Result<Vec<Client>> {
        let state = self.read()?;
        Ok(
            search_clients(state.ledger.clients(), query, self.lookup.normalize_identifiers)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    pub fn progress(&self, client: &Client) -> Result<Progress> {
        allocation::progress(&self.rules, client)
    }

    pub fn active_tickets(&self, client_id: &str) -> Result<Vec<Ticket>> {
        let client = self.client(client_id)?;
        Ok(client.active_tickets().into_iter().cloned().collect())
    }

    pub fn consumed_tickets(&self, client_id: &str) -> Result<Vec<Ticket>> {
        let client = self.client(client_id)?;
        Ok(client.consumed_tickets().into_iter().cloned().collect())
    }

    pub fn tickets(&self, status: Option<TicketStatus>) -> Result<Vec<TicketListing>> {
        Ok(self.read()?.ledger.listing(status))
    }

    pub fn draws(&self) -> Result<Vec<Draw>> {
        Ok(self.read()?.draws.draws().to_vec())
    }

    pub fn draw(&self, draw_id: &str) -> Result<Draw> {
        self.read()?
            .draws
            .get(draw_id)
            .cloned()
            .ok_or_else(|| SorteoError::DrawNotFound {
                draw_id: draw_id.to_string(),
            })
    }

    pub fn next_draw(&self) -> Result<Option<Draw>> {
        Ok(self.read()?.draws.next_upcoming().cloned())
    }

    pub fn completed_draws(&self) -> Result<Vec<Draw>> {
        Ok(self
            .read()?
            .draws
            .completed()
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn summary(&self) -> Result<ProgramSummary> {
        let state = self.read()?;
        let (active, consumed) = state
            .ledger
            .clients()
            .iter()
            .flat_map(Client::tickets)
            .fold((0, 0), |(active, consumed), ticket| {
                if ticket.is_active() {
                    (active + 1, consumed)
                } else {
                    (active, consumed + 1)
                }
            });

        Ok(ProgramSummary {
            program_name: self.program.name.clone(),
            clients: state.ledger.clients().len(),
            active_tickets: active,
            consumed_tickets: consumed,
            completed_draws: state
                .draws
                .draws()
                .iter()
                .filter(|d| d.status() == DrawStatus::Completed)
                .count(),
            next_draw: state.draws.next_upcoming().map(|d| d.name().to_string()),
        })
    }

    pub fn issue_tickets_if_due(&self, client_id: &str) -> Result<Vec<Ticket>> {
        let mut state = self.write()?;
        state.ledger.issue_tickets_if_due(&self.rules, client_id)
    }

    /// 記錄發票並發放號碼
    pub fn record_billing(&self, client_id: &str, amount: Decimal) -> Result<Vec<Ticket>> {
        let mut state = self.write()?;
        state.ledger.record_billing(&self.rules, client_id, amount)
    }

    pub fn schedule_draw(&self, draw: Draw) -> Result<()> {
        self.write()?.draws.schedule(draw)
    }

    /// Completes a draw with its winning tickets. All-or-nothing.
    pub fn finalize_draw(&self, draw_id: &str, results: Vec<DrawResult>) -> Result<Draw> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        state
            .draws
            .finalize(&mut state.ledger, &self.policy, draw_id, results)?;
        state
            .draws
            .get(draw_id)
            .cloned()
            .ok_or_else(|| SorteoError::DrawNotFound {
                draw_id: draw_id.to_string(),
            })
    }

    /// 匯出目前狀態為可重新載入的配置
    pub fn snapshot(&self) -> Result<SorteoConfig> {
        let state = self.read()?;
        Ok(SorteoConfig {
            program: self.program.clone(),
            lookup: self.lookup,
            draw_policy: self.policy,
            categories: self.rules(),
            clients: state
                .ledger
                .clients()
                .iter()
                .map(ClientSeed::from_client)
                .collect(),
            draws: state.draws.draws().iter().map(DrawSeed::from_draw).collect(),
        })
    }
}

use crate::core::draw::{validate_draw_definition, DrawPolicy};
use crate::core::rules::CategoryRuleTable;
use crate::core::{
    CategoryRule, Client, Consumption, Draw, DrawResult, DrawStatus, Prize, Ticket, TicketStatus,
    TierId,
};
use crate::utils::error::{Result, SorteoError};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative_amount, validate_positive_number,
    validate_unique, Validate,
};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_FIRST_TICKET_NUMBER: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorteoConfig {
    pub program: ProgramConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub draw_policy: DrawPolicy,
    /// 空白時使用標準門檻
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    #[serde(default)]
    pub clients: Vec<ClientSeed>,
    #[serde(default)]
    pub draws: Vec<DrawSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub name: String,
    #[serde(default = "default_first_ticket_number")]
    pub first_ticket_number: u32,
}

fn default_first_ticket_number() -> u32 {
    DEFAULT_FIRST_TICKET_NUMBER
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub normalize_identifiers: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            normalize_identifiers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSeed {
    pub id: String,
    pub name: String,
    pub tax_id: String,
    pub national_id: String,
    pub category: TierId,
    #[serde(default)]
    pub total_billed: Decimal,
    #[serde(default)]
    pub tickets: Vec<TicketSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSeed {
    pub id: String,
    pub number: u32,
    pub status: TicketStatus,
    pub assigned_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawSeed {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub status: DrawStatus,
    pub prizes: Vec<Prize>,
    #[serde(default)]
    pub results: Vec<DrawResult>,
}

impl SorteoConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SorteoError::IoError)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            "📁 Loaded '{}' from {}: {} clients, {} draws",
            config.program.name,
            path.as_ref().display(),
            config.clients.len(),
            config.draws.len()
        );
        Ok(config)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SorteoError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 將配置寫回 TOML 檔案
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(&path, self.to_toml_string()?)?;
        tracing::info!("💾 Saved state to {}", path.as_ref().display());
        Ok(())
    }

    /// 替換環境變數 (例如 ${PROGRAM_NAME})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SorteoError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn rule_table(&self) -> Result<CategoryRuleTable> {
        if self.categories.is_empty() {
            tracing::debug!("No [[categories]] configured, using standard rules");
            return Ok(CategoryRuleTable::standard());
        }
        CategoryRuleTable::new(self.categories.clone())
    }

    /// 驗證客戶資料並轉換為領域模型
    pub fn build_clients(&self) -> Result<Vec<Client>> {
        validate_unique("clients.id", self.clients.iter().map(|c| c.id.as_str()))?;
        validate_unique(
            "clients.tickets.id",
            self.clients
                .iter()
                .flat_map(|c| c.tickets.iter().map(|t| t.id.as_str())),
        )?;
        validate_unique(
            "clients.tickets.number",
            self.clients
                .iter()
                .flat_map(|c| c.tickets.iter().map(|t| t.number)),
        )?;

        let draw_statuses: HashMap<&str, DrawStatus> =
            self.draws.iter().map(|d| (d.id.as_str(), d.status)).collect();
        self.clients
            .iter()
            .map(|seed| seed.to_client(&draw_statuses))
            .collect()
    }

    pub fn build_draws(&self) -> Result<Vec<Draw>> {
        self.draws
            .iter()
            .map(|seed| {
                let draw = seed.to_draw();
                validate_draw_definition(&draw)?;
                Ok(draw)
            })
            .collect()
    }
}

impl ClientSeed {
    fn to_client(&self, draw_statuses: &HashMap<&str, DrawStatus>) -> Result<Client> {
        validate_non_empty_string("clients.id", &self.id)?;
        validate_non_empty_string(&format!("clients.{}.name", self.id), &self.name)?;
        validate_non_negative_amount(&format!("clients.{}.total_billed", self.id), self.total_billed)?;

        let tickets = self
            .tickets
            .iter()
            .map(|seed| seed.to_ticket(&self.id, draw_statuses))
            .collect::<Result<Vec<_>>>()?;

        Ok(Client::from_parts(
            self.id.clone(),
            self.name.clone(),
            self.tax_id.clone(),
            self.national_id.clone(),
            self.category,
            self.total_billed,
            tickets,
        ))
    }

    pub fn from_client(client: &Client) -> Self {
        Self {
            id: client.id().to_string(),
            name: client.name().to_string(),
            tax_id: client.tax_id().to_string(),
            national_id: client.national_id().to_string(),
            category: client.category(),
            total_billed: client.total_billed(),
            tickets: client.tickets().iter().map(TicketSeed::from_ticket).collect(),
        }
    }
}

impl TicketSeed {
    fn to_ticket(
        &self,
        client_id: &str,
        draw_statuses: &HashMap<&str, DrawStatus>,
    ) -> Result<Ticket> {
        let field = format!("clients.{}.tickets.{}", client_id, self.id);
        validate_non_empty_string(&format!("clients.{}.tickets.id", client_id), &self.id)?;
        validate_positive_number(&format!("{}.number", field), self.number, 1)?;

        let consumption = match (&self.consumed_at, &self.draw_id, &self.prize_name) {
            (Some(consumed_at), Some(draw_id), Some(prize_name)) => Some(Consumption {
                consumed_at: *consumed_at,
                draw_id: draw_id.clone(),
                prize_name: prize_name.clone(),
            }),
            (None, None, None) => None,
            _ => {
                return Err(SorteoError::ConfigValidationError {
                    field,
                    message: "consumed_at, draw_id and prize_name must be set together".to_string(),
                })
            }
        };

        match (self.status, consumption) {
            (TicketStatus::Active, None) => Ok(Ticket::new_active(
                self.id.clone(),
                self.number,
                client_id.to_string(),
                self.assigned_at,
            )),
            (TicketStatus::Consumed, Some(consumption)) => {
                match draw_statuses.get(consumption.draw_id.as_str()) {
                    Some(DrawStatus::Upcoming) => {
                        return Err(SorteoError::ConfigValidationError {
                            field,
                            message: format!(
                                "consumed by draw '{}', which has not been held yet",
                                consumption.draw_id
                            ),
                        })
                    }
                    Some(DrawStatus::Completed) => {}
                    None => tracing::warn!(
                        "⚠️ Ticket {} was consumed by draw {}, which is not configured",
                        self.number,
                        consumption.draw_id
                    ),
                }
                Ok(Ticket::new_consumed(
                    self.id.clone(),
                    self.number,
                    client_id.to_string(),
                    self.assigned_at,
                    consumption,
                ))
            }
            (status, _) => Err(SorteoError::ConfigValidationError {
                field,
                message: format!(
                    "a {} ticket must {} consumption details",
                    status,
                    if status == TicketStatus::Active { "not carry" } else { "carry" }
                ),
            }),
        }
    }

    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id().to_string(),
            number: ticket.number(),
            status: ticket.status(),
            assigned_at: ticket.assigned_at(),
            consumed_at: ticket.consumed_at(),
            draw_id: ticket.draw_id().map(str::to_string),
            prize_name: ticket.prize_name().map(str::to_string),
        }
    }
}

impl DrawSeed {
    fn to_draw(&self) -> Draw {
        match self.status {
            DrawStatus::Upcoming => Draw::upcoming(
                self.id.clone(),
                self.name.clone(),
                self.date,
                self.prizes.clone(),
            ),
            DrawStatus::Completed => Draw::completed(
                self.id.clone(),
                self.name.clone(),
                self.date,
                self.prizes.clone(),
                self.results.clone(),
            ),
        }
    }

    pub fn from_draw(draw: &Draw) -> Self {
        Self {
            id: draw.id().to_string(),
            name: draw.name().to_string(),
            date: draw.date(),
            status: draw.status(),
            prizes: draw.prizes().to_vec(),
            results: draw.results().to_vec(),
        }
    }
}

impl Validate for SorteoConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("program.name", &self.program.name)?;
        validate_positive_number("program.first_ticket_number", self.program.first_ticket_number, 1)?;
        self.rule_table()?;
        self.build_clients()?;
        self.build_draws()?;
        Ok(())
    }
}

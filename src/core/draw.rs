use crate::core::ledger::TicketLedger;
use crate::core::{Consumption, Draw, DrawResult, DrawStatus};
use crate::utils::error::{Result, SorteoError};
use crate::utils::validation::{validate_dense_positions, validate_non_empty_string, validate_unique};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Rules applied when checking a draw's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawPolicy {
    /// One client may hold several winning tickets in the same draw.
    pub allow_multiple_wins_per_client: bool,
    /// 得獎者名稱須與號碼持有人一致
    pub verify_winner_names: bool,
}

impl Default for DrawPolicy {
    fn default() -> Self {
        Self {
            allow_multiple_wins_per_client: true,
            verify_winner_names: false,
        }
    }
}

/// Checks that a draw is well formed: it has prizes, prize ids are unique, positions are dense.
pub fn validate_draw_definition(draw: &Draw) -> Result<()> {
    validate_non_empty_string("draws.id", draw.id())?;
    validate_non_empty_string("draws.name", draw.name())?;

    if draw.prizes().is_empty() {
        return Err(SorteoError::InvalidConfigValueError {
            field: format!("draws.{}.prizes", draw.id()),
            value: "[]".to_string(),
            reason: "A draw needs at least one prize".to_string(),
        });
    }

    validate_unique(
        &format!("draws.{}.prizes.id", draw.id()),
        draw.prizes().iter().map(|p| p.id.as_str()),
    )?;
    let positions: Vec<u32> = draw.prizes().iter().map(|p| p.position).collect();
    validate_dense_positions(&format!("draws.{}.prizes.position", draw.id()), &positions)?;

    let has_results = !draw.results().is_empty();
    let completed = draw.status() == DrawStatus::Completed;
    if has_results != completed {
        return Err(SorteoError::InvalidConfigValueError {
            field: format!("draws.{}.results", draw.id()),
            value: format!("{} result(s)", draw.results().len()),
            reason: "Results must be present exactly when the draw is completed".to_string(),
        });
    }

    validate_result_prizes(draw, draw.results())
}

/// Every result names a prize of `draw`, each prize has at most one winner
/// and each ticket wins at most once.
fn validate_result_prizes(draw: &Draw, results: &[DrawResult]) -> Result<()> {
    let invalid = |reason: String| SorteoError::InvalidDrawResult {
        draw_id: draw.id().to_string(),
        reason,
    };

    let mut prizes_awarded = HashSet::new();
    let mut numbers_drawn = HashSet::new();
    for result in results {
        if draw.prize(&result.prize_id).is_none() {
            return Err(invalid(format!(
                "prize '{}' does not belong to this draw",
                result.prize_id
            )));
        }
        if !prizes_awarded.insert(result.prize_id.as_str()) {
            return Err(invalid(format!(
                "prize '{}' has more than one winner",
                result.prize_id
            )));
        }
        if !numbers_drawn.insert(result.ticket_number) {
            return Err(invalid(format!(
                "ticket {} appears more than once",
                result.ticket_number
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct DrawBook {
    draws: Vec<Draw>,
    by_id: HashMap<String, usize>,
}

impl DrawBook {
    pub fn new(draws: Vec<Draw>) -> Result<Self> {
        let mut book = Self::default();
        for draw in draws {
            book.insert(draw)?;
        }
        Ok(book)
    }

    fn insert(&mut self, draw: Draw) -> Result<()> {
        validate_draw_definition(&draw)?;
        if self.by_id.contains_key(draw.id()) {
            return Err(SorteoError::ConfigValidationError {
                field: "draws.id".to_string(),
                message: format!("draw id '{}' is used more than once", draw.id()),
            });
        }
        self.by_id.insert(draw.id().to_string(), self.draws.len());
        self.draws.push(draw);
        Ok(())
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn get(&self, draw_id: &str) -> Option<&Draw> {
        self.by_id.get(draw_id).map(|&idx| &self.draws[idx])
    }

    /// 最近一場即將舉行的抽獎
    pub fn next_upcoming(&self) -> Option<&Draw> {
        self.draws
            .iter()
            .filter(|d| d.status() == DrawStatus::Upcoming)
            .min_by_key(|d| d.date())
    }

    /// Completed draws, most recent first.
    pub fn completed(&self) -> Vec<&Draw> {
        let mut completed: Vec<&Draw> = self
            .draws
            .iter()
            .filter(|d| d.status() == DrawStatus::Completed)
            .collect();
        completed.sort_by(|a, b| b.date().cmp(&a.date()));
        completed
    }

    /// 新增即將舉行的抽獎
    pub fn schedule(&mut self, draw: Draw) -> Result<()> {
        if draw.status() != DrawStatus::Upcoming {
            return Err(SorteoError::AlreadyFinalized {
                draw_id: draw.id().to_string(),
            });
        }
        let draw_id = draw.id().to_string();
        let date = draw.date();
        self.insert(draw)?;
        tracing::info!("📅 Draw {} scheduled for {}", draw_id, date);
        Ok(())
    }

    /// Completes a draw: every winning ticket is consumed and the results are recorded.
    ///
    /// The whole result set is checked before anything changes. On error neither the
    /// draw nor any ticket is modified.
    pub fn finalize(
        &mut self,
        ledger: &mut TicketLedger,
        policy: &DrawPolicy,
        draw_id: &str,
        results: Vec<DrawResult>,
    ) -> Result<()> {
        let draw_idx = *self
            .by_id
            .get(draw_id)
            .ok_or_else(|| SorteoError::DrawNotFound {
                draw_id: draw_id.to_string(),
            })?;

        let plan = match plan_consumption(&self.draws[draw_idx], ledger, policy, &results) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!("❌ Draw {} rejected: {}", draw_id, e);
                return Err(e);
            }
        };

        for (number, consumption) in plan {
            ledger.consume(number, consumption);
        }
        let winners = results.len();
        self.draws[draw_idx].complete(results);

        tracing::info!("🏆 Draw {} finalized with {} winning ticket(s)", draw_id, winners);
        Ok(())
    }
}

/// Validates `results` against the draw and the ledger and returns the consumptions to apply.
fn plan_consumption(
    draw: &Draw,
    ledger: &TicketLedger,
    policy: &DrawPolicy,
    results: &[DrawResult],
) -> Result<Vec<(u32, Consumption)>> {
    let invalid = |reason: String| SorteoError::InvalidDrawResult {
        draw_id: draw.id().to_string(),
        reason,
    };

    if draw.status() != DrawStatus::Upcoming {
        return Err(SorteoError::AlreadyFinalized {
            draw_id: draw.id().to_string(),
        });
    }
    if results.is_empty() {
        return Err(invalid("a completed draw needs at least one result".to_string()));
    }

    validate_result_prizes(draw, results)?;

    let mut winners = HashSet::new();
    let mut plan = Vec::with_capacity(results.len());
    for result in results {
        let (owner, ticket) =
            ledger
                .locate(result.ticket_number)
                .ok_or_else(|| SorteoError::UnknownTicketNumber {
                    number: result.ticket_number,
                    draw_id: draw.id().to_string(),
                })?;

        if !ticket.is_active() {
            return Err(SorteoError::TicketAlreadyConsumed {
                number: ticket.number(),
                draw_id: draw.id().to_string(),
            });
        }
        if policy.verify_winner_names && owner.name() != result.client_name {
            return Err(invalid(format!(
                "ticket {} belongs to '{}', not '{}'",
                ticket.number(),
                owner.name(),
                result.client_name
            )));
        }
        if !policy.allow_multiple_wins_per_client && !winners.insert(owner.id()) {
            return Err(invalid(format!(
                "client {} holds more than one winning ticket",
                owner.id()
            )));
        }

        let prize_name = draw
            .prize(&result.prize_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        plan.push((
            ticket.number(),
            Consumption {
                consumed_at: draw.date(),
                draw_id: draw.id().to_string(),
                prize_name,
            },
        ));
    }

    Ok(plan)
}

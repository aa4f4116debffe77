use crate::core::{CategoryRule, TierId};
use crate::utils::error::{Result, SorteoError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Tier → threshold table. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct CategoryRuleTable {
    rules: HashMap<TierId, CategoryRule>,
}

impl CategoryRuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        let mut table = HashMap::with_capacity(rules.len());

        for rule in rules {
            if rule.threshold_usd <= Decimal::ZERO {
                return Err(SorteoError::InvalidConfigValueError {
                    field: format!("categories.{}.threshold_usd", rule.category),
                    value: rule.threshold_usd.to_string(),
                    reason: "Threshold must be positive".to_string(),
                });
            }
            let category = rule.category;
            if table.insert(category, rule).is_some() {
                return Err(SorteoError::ConfigValidationError {
                    field: "categories".to_string(),
                    message: format!("tier {} has more than one rule", category),
                });
            }
        }

        for tier in TierId::ALL {
            if !table.contains_key(&tier) {
                tracing::warn!("⚠️ No category rule for tier {}; its clients cannot earn tickets", tier);
            }
        }

        Ok(Self { rules: table })
    }

    /// 標準門檻
    pub fn standard() -> Self {
        let rules = [
            (TierId::Diamante, dec!(5000), "5.000"),
            (TierId::Oro, dec!(10000), "10.000"),
            (TierId::Plata, dec!(15000), "15.000"),
            (TierId::Gremio, dec!(20000), "20.000"),
        ]
        .into_iter()
        .map(|(category, threshold_usd, label)| {
            (
                category,
                CategoryRule {
                    category,
                    threshold_usd,
                    description: format!("1 número cada USD {} facturados", label),
                },
            )
        })
        .collect();

        Self { rules }
    }

    pub fn rule_for(&self, tier: TierId) -> Option<&CategoryRule> {
        self.rules.get(&tier)
    }

    /// Like [`rule_for`](Self::rule_for), but a missing rule is a configuration error.
    pub fn require(&self, tier: TierId) -> Result<&CategoryRule> {
        self.rule_for(tier).ok_or_else(|| SorteoError::UnknownCategory {
            category: tier.to_string(),
        })
    }

    pub fn rules(&self) -> Vec<&CategoryRule> {
        let mut rules: Vec<&CategoryRule> = self.rules.values().collect();
        rules.sort_by(|a, b| {
            a.threshold_usd
                .cmp(&b.threshold_usd)
                .then(a.category.cmp(&b.category))
        });
        rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

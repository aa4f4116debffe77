use crate::core::rules::CategoryRuleTable;
use crate::core::{Client, Progress};
use crate::utils::error::{Result, SorteoError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// `floor(total_billed / threshold)`. An exact multiple earns its ticket immediately.
pub fn tickets_earned(total_billed: Decimal, threshold: Decimal) -> Result<u32> {
    if threshold <= Decimal::ZERO {
        return Err(SorteoError::InvalidConfigValueError {
            field: "threshold_usd".to_string(),
            value: threshold.to_string(),
            reason: "Threshold must be positive".to_string(),
        });
    }
    if total_billed < Decimal::ZERO {
        return Err(SorteoError::ValidationError {
            message: format!("total billed cannot be negative ({})", total_billed),
        });
    }

    total_billed
        .checked_div(threshold)
        .and_then(|tickets| tickets.trunc().to_u32())
        .ok_or_else(|| SorteoError::ValidationError {
            message: format!(
                "total billed {} earns more tickets than can be numbered",
                total_billed
            ),
        })
}

/// Progress of `total_billed` toward the next ticket. Pure; never mints anything.
pub fn progress_for(total_billed: Decimal, threshold: Decimal) -> Result<Progress> {
    let earned = tickets_earned(total_billed, threshold)?;
    let consumed_by_tickets = Decimal::from(earned) * threshold;
    let current_residual = total_billed - consumed_by_tickets;
    let percentage = current_residual / threshold * Decimal::ONE_HUNDRED;

    Ok(Progress {
        current_residual,
        threshold,
        percentage,
        tickets_earned: earned,
        remaining_to_next: threshold - current_residual,
    })
}

/// 依客戶等級門檻計算進度
pub fn progress(rules: &CategoryRuleTable, client: &Client) -> Result<Progress> {
    let rule = rules.require(client.category())?;
    let view = progress_for(client.total_billed(), rule.threshold_usd)?;

    tracing::debug!(
        "Progress for client {}: {} earned, residual {} of {} ({}%)",
        client.id(),
        view.tickets_earned,
        view.current_residual,
        view.threshold,
        view.percentage
    );

    Ok(view)
}

pub fn client_tickets_earned(rules: &CategoryRuleTable, client: &Client) -> Result<u32> {
    let rule = rules.require(client.category())?;
    tickets_earned(client.total_billed(), rule.threshold_usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TierId;
    use rust_decimal_macros::dec;

    fn client(category: TierId, total: Decimal) -> Client {
        Client::new(
            "1".into(),
            "Distribuidora Norte S.A.".into(),
            "30-71234567-8".into(),
            "27345678".into(),
            category,
        )
        .with_total_billed(total)
    }

    #[test]
    fn test_diamante_example() {
        let rules = CategoryRuleTable::standard();
        let view = progress(&rules, &client(TierId::Diamante, dec!(47500))).unwrap();

        assert_eq!(view.tickets_earned, 9);
        assert_eq!(view.current_residual, dec!(2500));
        assert_eq!(view.threshold, dec!(5000));
        assert_eq!(view.percentage, dec!(50));
        assert_eq!(view.remaining_to_next, dec!(2500));
    }

    #[test]
    fn test_exact_multiple_earns_ticket() {
        assert_eq!(tickets_earned(dec!(10000), dec!(5000)).unwrap(), 2);
        assert_eq!(tickets_earned(dec!(9999.99), dec!(5000)).unwrap(), 1);

        let view = progress_for(dec!(10000), dec!(5000)).unwrap();
        assert_eq!(view.current_residual, Decimal::ZERO);
        assert_eq!(view.percentage, Decimal::ZERO);
    }

    #[test]
    fn test_zero_billing() {
        let view = progress_for(Decimal::ZERO, dec!(15000)).unwrap();
        assert_eq!(view.tickets_earned, 0);
        assert_eq!(view.current_residual, Decimal::ZERO);
        assert_eq!(view.remaining_to_next, dec!(15000));
    }

    #[test]
    fn test_residual_always_below_threshold() {
        let thresholds = [dec!(5000), dec!(10000), dec!(15000), dec!(20000), dec!(0.01)];
        let totals = [
            dec!(0),
            dec!(0.01),
            dec!(4999.99),
            dec!(5000),
            dec!(18000),
            dec!(32000),
            dec!(47500),
            dec!(123456.78),
        ];

        for threshold in thresholds {
            for total in totals {
                let view = progress_for(total, threshold).unwrap();
                assert!(view.current_residual >= Decimal::ZERO);
                assert!(view.current_residual < threshold);
                assert!(view.percentage >= Decimal::ZERO && view.percentage < dec!(100));
                assert_eq!(
                    Decimal::from(view.tickets_earned),
                    (total / threshold).floor()
                );
            }
        }
    }

    #[test]
    fn test_missing_rule_fails_instead_of_defaulting() {
        let rules = CategoryRuleTable::new(vec![]).unwrap();
        let result = progress(&rules, &client(TierId::Oro, dec!(32000)));
        assert!(matches!(result, Err(SorteoError::UnknownCategory { .. })));
    }

    #[test]
    fn test_oversized_quotient_is_an_error() {
        let tiny = Decimal::new(1, 28);
        assert!(matches!(
            tickets_earned(Decimal::MAX, tiny),
            Err(SorteoError::ValidationError { .. })
        ));
        assert!(tickets_earned(Decimal::from(1_000_000_000_000u64), Decimal::ONE).is_err());
    }

    #[test]
    fn test_negative_billing_rejected() {
        assert!(tickets_earned(dec!(-1), dec!(5000)).is_err());
        assert!(tickets_earned(dec!(1), Decimal::ZERO).is_err());
    }
}

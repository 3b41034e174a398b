//! Journal lines for inventory count adjustments.
//!
//! After a stock count posts, each line's variance is valued at the
//! product's unit cost and rolled into one balanced journal entry:
//! shortages expense the missing value, overages recognize the surplus.

use tadbir_core::{DomainError, DomainResult, ValueObject};

use crate::journal::{Account, AccountKind, JournalEntryLine};

/// Valued variance of a single counted product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockVariance {
    /// Signed quantity difference, counted minus recorded.
    pub quantity: i64,
    /// Unit cost in minor currency units. Uncosted variances carry no
    /// journal impact and are skipped.
    pub unit_cost: Option<u64>,
}

impl ValueObject for StockVariance {}

/// Inventory asset account adjusted by count variances.
pub fn inventory_account() -> Account {
    Account {
        code: "1400".to_string(),
        name: "Inventory".to_string(),
        kind: AccountKind::Asset,
    }
}

/// Expense account charged for stock found missing.
pub fn shrinkage_account() -> Account {
    Account {
        code: "5800".to_string(),
        name: "Inventory Shrinkage".to_string(),
        kind: AccountKind::Expense,
    }
}

/// Revenue account credited for stock found over.
pub fn overage_account() -> Account {
    Account {
        code: "4800".to_string(),
        name: "Inventory Count Overage".to_string(),
        kind: AccountKind::Revenue,
    }
}

/// Build the balanced journal lines for a posted count's variances.
///
/// Shortages debit shrinkage and credit inventory; overages debit
/// inventory and credit overage. Each direction is aggregated into a
/// single debit/credit pair, so the result has zero, two, or four lines.
/// An empty result means no variance was valued and the caller should
/// skip the journal entry altogether.
pub fn adjustment_entry_lines(variances: &[StockVariance]) -> DomainResult<Vec<JournalEntryLine>> {
    let mut shortage_value: i128 = 0;
    let mut overage_value: i128 = 0;

    for variance in variances {
        let Some(unit_cost) = variance.unit_cost else {
            continue;
        };
        let value = i128::from(variance.quantity.unsigned_abs()) * i128::from(unit_cost);
        if variance.quantity < 0 {
            shortage_value += value;
        } else if variance.quantity > 0 {
            overage_value += value;
        }
    }

    let mut lines = Vec::new();

    if shortage_value > 0 {
        let amount = to_amount(shortage_value)?;
        lines.push(JournalEntryLine {
            account: shrinkage_account(),
            amount,
            is_debit: true,
        });
        lines.push(JournalEntryLine {
            account: inventory_account(),
            amount,
            is_debit: false,
        });
    }

    if overage_value > 0 {
        let amount = to_amount(overage_value)?;
        lines.push(JournalEntryLine {
            account: inventory_account(),
            amount,
            is_debit: true,
        });
        lines.push(JournalEntryLine {
            account: overage_account(),
            amount,
            is_debit: false,
        });
    }

    Ok(lines)
}

fn to_amount(value: i128) -> DomainResult<i64> {
    i64::try_from(value)
        .map_err(|_| DomainError::validation("adjustment value exceeds journal amount range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn variance(quantity: i64, unit_cost: Option<u64>) -> StockVariance {
        StockVariance {
            quantity,
            unit_cost,
        }
    }

    #[test]
    fn shortage_debits_shrinkage_and_credits_inventory() {
        let lines = adjustment_entry_lines(&[variance(-5, Some(100))]).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account.code, "5800");
        assert_eq!(lines[0].amount, 500);
        assert!(lines[0].is_debit);
        assert_eq!(lines[1].account.code, "1400");
        assert_eq!(lines[1].amount, 500);
        assert!(!lines[1].is_debit);
    }

    #[test]
    fn overage_debits_inventory_and_credits_overage() {
        let lines = adjustment_entry_lines(&[variance(2, Some(250))]).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account.code, "1400");
        assert_eq!(lines[0].amount, 500);
        assert!(lines[0].is_debit);
        assert_eq!(lines[1].account.code, "4800");
        assert_eq!(lines[1].amount, 500);
        assert!(!lines[1].is_debit);
    }

    #[test]
    fn mixed_variances_produce_both_pairs() {
        let lines = adjustment_entry_lines(&[
            variance(-5, Some(100)),
            variance(3, Some(200)),
            variance(-1, Some(50)),
        ])
        .unwrap();

        assert_eq!(lines.len(), 4);
        // 5 * 100 + 1 * 50 missing, 3 * 200 over.
        assert_eq!(lines[0].account.code, "5800");
        assert_eq!(lines[0].amount, 550);
        assert_eq!(lines[2].account.code, "1400");
        assert_eq!(lines[2].amount, 600);

        let debits: i128 = lines
            .iter()
            .filter(|l| l.is_debit)
            .map(|l| i128::from(l.amount))
            .sum();
        let credits: i128 = lines
            .iter()
            .filter(|l| !l.is_debit)
            .map(|l| i128::from(l.amount))
            .sum();
        assert_eq!(debits, credits);
    }

    #[test]
    fn uncosted_variances_are_skipped() {
        let lines = adjustment_entry_lines(&[variance(-5, None), variance(7, None)]).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn zero_quantity_variances_are_skipped() {
        let lines = adjustment_entry_lines(&[variance(0, Some(100))]).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn value_overflow_is_rejected() {
        let err = adjustment_entry_lines(&[variance(-i64::MAX, Some(u64::MAX))]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn entry_lines_always_balance(
            variances in prop::collection::vec(
                (-1_000i64..=1_000, prop::option::of(0u64..=10_000)),
                0..12,
            )
        ) {
            let variances: Vec<StockVariance> = variances
                .into_iter()
                .map(|(quantity, unit_cost)| variance(quantity, unit_cost))
                .collect();

            let lines = adjustment_entry_lines(&variances).unwrap();

            let debits: i128 = lines
                .iter()
                .filter(|l| l.is_debit)
                .map(|l| i128::from(l.amount))
                .sum();
            let credits: i128 = lines
                .iter()
                .filter(|l| !l.is_debit)
                .map(|l| i128::from(l.amount))
                .sum();
            prop_assert_eq!(debits, credits);
            for line in &lines {
                prop_assert!(line.amount > 0);
            }
        }
    }
}

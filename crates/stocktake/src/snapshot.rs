//! Seeding count lines from a warehouse stock snapshot.

use serde::{Deserialize, Serialize};

use tadbir_core::ValueObject;
use tadbir_products::ProductId;

use crate::count::CountLine;

/// One product's stock position in a warehouse, as reported by the
/// stock-on-hand read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshotLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_cost: Option<u64>,
    pub on_hand: i64,
}

impl ValueObject for StockSnapshotLine {}

/// Build the draft lines for a new count from a warehouse snapshot.
///
/// Only products with positive stock on hand participate; every line starts
/// uncounted. Snapshot order is preserved, so the count sheet reads in the
/// same order as the stock report it came from.
pub fn seed_count_lines(snapshot: &[StockSnapshotLine]) -> Vec<CountLine> {
    snapshot
        .iter()
        .filter(|line| line.on_hand > 0)
        .map(|line| CountLine {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            unit_cost: line.unit_cost,
            system_qty: line.on_hand,
            counted: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tadbir_core::AggregateId;

    fn snapshot_line(name: &str, on_hand: i64, unit_cost: Option<u64>) -> StockSnapshotLine {
        StockSnapshotLine {
            product_id: ProductId::new(AggregateId::new()),
            product_name: name.to_string(),
            unit_cost,
            on_hand,
        }
    }

    #[test]
    fn seeds_one_uncounted_line_per_stocked_product() {
        let snapshot = vec![
            snapshot_line("Olive Oil 1L", 50, Some(2500)),
            snapshot_line("Basmati Rice 5kg", 20, None),
        ];

        let lines = seed_count_lines(&snapshot);
        assert_eq!(lines.len(), 2);

        for (line, source) in lines.iter().zip(&snapshot) {
            assert_eq!(line.product_id, source.product_id);
            assert_eq!(line.product_name, source.product_name);
            assert_eq!(line.unit_cost, source.unit_cost);
            assert_eq!(line.system_qty, source.on_hand);
            assert!(!line.is_counted());
            assert_eq!(line.variance(), 0);
        }
    }

    #[test]
    fn skips_products_without_positive_stock() {
        let snapshot = vec![
            snapshot_line("Olive Oil 1L", 50, None),
            snapshot_line("Out Of Stock", 0, None),
            snapshot_line("Oversold", -3, None),
            snapshot_line("Basmati Rice 5kg", 20, None),
        ];

        let lines = seed_count_lines(&snapshot);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Olive Oil 1L");
        assert_eq!(lines[1].product_name, "Basmati Rice 5kg");
    }

    #[test]
    fn preserves_snapshot_order() {
        let snapshot: Vec<StockSnapshotLine> = (1..=6)
            .map(|i| snapshot_line(&format!("Product {i}"), i, None))
            .collect();

        let lines = seed_count_lines(&snapshot);
        let names: Vec<&str> = lines.iter().map(|l| l.product_name.as_str()).collect();
        assert_eq!(
            names,
            ["Product 1", "Product 2", "Product 3", "Product 4", "Product 5", "Product 6"]
        );
    }

    #[test]
    fn empty_snapshot_seeds_empty_count() {
        assert!(seed_count_lines(&[]).is_empty());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: Seeded lines cover exactly the positive-stock rows,
            /// in snapshot order, and every line starts uncounted.
            #[test]
            fn seeds_exactly_the_positive_stock_rows(
                quantities in proptest::collection::vec(-100i64..1_000, 0..40)
            ) {
                let snapshot: Vec<StockSnapshotLine> = quantities
                    .iter()
                    .enumerate()
                    .map(|(i, &on_hand)| snapshot_line(&format!("Product {i}"), on_hand, None))
                    .collect();

                let lines = seed_count_lines(&snapshot);
                let stocked: Vec<&StockSnapshotLine> =
                    snapshot.iter().filter(|s| s.on_hand > 0).collect();

                prop_assert_eq!(lines.len(), stocked.len());
                for (line, source) in lines.iter().zip(stocked) {
                    prop_assert_eq!(line.product_id, source.product_id);
                    prop_assert_eq!(line.system_qty, source.on_hand);
                    prop_assert!(line.system_qty > 0);
                    prop_assert!(!line.is_counted());
                }
            }
        }
    }
}

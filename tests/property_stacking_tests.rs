use plotive::core::{Accessor, Dataset, DomainValue};
use plotive::stacking::{self, StackingOrder};
use proptest::prelude::*;

type Row = Vec<f64>;

fn key_accessor() -> Accessor<(usize, f64)> {
    Accessor::field(|datum: &(usize, f64)| DomainValue::number(datum.0 as f64))
}

fn value_accessor() -> Accessor<(usize, f64)> {
    Accessor::number(|datum: &(usize, f64)| datum.1)
}

fn datasets_from_rows(rows: &[Row]) -> Vec<Dataset<(usize, f64)>> {
    rows.iter()
        .map(|row| Dataset::new(row.iter().copied().enumerate().collect()))
        .collect()
}

proptest! {
    #[test]
    fn offsets_partition_the_per_key_totals_property(
        rows in proptest::collection::vec(
            proptest::collection::vec(-100.0f64..100.0, 4),
            1..6,
        )
    ) {
        let datasets = datasets_from_rows(&rows);
        let result = stacking::stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::BottomUp,
        );

        for key_index in 0..4 {
            let key = DomainValue::number(key_index as f64).normalized_key();
            let mut positive = 0.0f64;
            let mut negative = 0.0f64;
            for (row, dataset) in rows.iter().zip(&datasets) {
                let value = row[key_index];
                let stacked = &result[&dataset.id()][&key];
                // Each datum floors on the accumulated total of its sign.
                if value >= 0.0 {
                    prop_assert!((stacked.offset - positive).abs() <= 1e-9);
                    positive += value;
                } else {
                    prop_assert!((stacked.offset - negative).abs() <= 1e-9);
                    negative += value;
                }
                prop_assert!((stacked.value - value).abs() <= 1e-9);
            }
        }
    }

    #[test]
    fn stacked_extent_bounds_every_bar_and_includes_zero_property(
        rows in proptest::collection::vec(
            proptest::collection::vec(-100.0f64..100.0, 3),
            1..6,
        )
    ) {
        let datasets = datasets_from_rows(&rows);
        let result = stacking::stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::BottomUp,
        );
        let (min, max) =
            stacking::stacked_extent(&result, &datasets, &key_accessor(), None);

        prop_assert!(min <= 0.0);
        prop_assert!(max >= 0.0);
        for keyed in result.values() {
            for stacked in keyed.values() {
                let top = stacked.offset + stacked.value;
                prop_assert!(min <= top && top <= max);
                prop_assert!(min <= stacked.offset && stacked.offset <= max);
            }
        }
    }

    #[test]
    fn processing_order_never_changes_the_stack_totals_property(
        rows in proptest::collection::vec(
            proptest::collection::vec(0.0f64..100.0, 3),
            2..6,
        )
    ) {
        let datasets = datasets_from_rows(&rows);
        let bottom_up = stacking::stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::BottomUp,
        );
        let top_down = stacking::stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::TopDown,
        );

        let extent_up =
            stacking::stacked_extent(&bottom_up, &datasets, &key_accessor(), None);
        let extent_down =
            stacking::stacked_extent(&top_down, &datasets, &key_accessor(), None);
        prop_assert!((extent_up.0 - extent_down.0).abs() <= 1e-9);
        prop_assert!((extent_up.1 - extent_down.1).abs() <= 1e-9);
    }
}

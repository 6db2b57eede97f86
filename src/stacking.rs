//! Stacking offsets for stacked bar/area plots.
//!
//! Positive and negative values stack independently from a zero baseline, so
//! mixed-sign data produces diverging stacks. Offsets are recomputed from
//! scratch on every relevant mutation; the algorithm is deterministic for
//! fixed inputs.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::accessor::{Accessor, DatumFilter};
use crate::core::dataset::{Dataset, DatasetId};
use crate::core::value::DomainValue;

/// Stacking direction. `BottomUp` puts the first dataset at the baseline;
/// `TopDown` reverses the accumulation order (matching legend order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StackingOrder {
    #[default]
    BottomUp,
    TopDown,
}

/// The stacked position of one datum: the baseline it starts from and the
/// value it contributes, plus the raw key for axis use.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedDatum {
    pub offset: f64,
    pub value: f64,
    pub axis_value: DomainValue,
}

pub type KeyToStackedDatum = IndexMap<String, StackedDatum>;

/// Dataset → (normalized key → stacked datum), in original dataset order.
pub type StackingResult = IndexMap<DatasetId, KeyToStackedDatum>;

/// Computes the offset and value for each datum in each dataset.
///
/// Keys are normalized via [`DomainValue::normalized_key`], so the number
/// `2.0` and the text `"2"` share a stack. Non-finite values are excluded
/// entirely: the datum gets no stacked entry and moves no running total.
pub fn stack<D>(
    datasets: &[Dataset<D>],
    key_accessor: &Accessor<D>,
    value_accessor: &Accessor<D>,
    order: StackingOrder,
) -> StackingResult {
    let mut positive_offsets: IndexMap<String, f64> = IndexMap::new();
    let mut negative_offsets: IndexMap<String, f64> = IndexMap::new();

    // Seed the result in original dataset order; only processing order
    // reverses for topdown.
    let mut result: StackingResult = datasets
        .iter()
        .map(|dataset| (dataset.id(), KeyToStackedDatum::new()))
        .collect();

    let mut processing: Vec<&Dataset<D>> = datasets.iter().collect();
    if order == StackingOrder::TopDown {
        processing.reverse();
    }

    for dataset in processing {
        let mut key_to_datum = KeyToStackedDatum::new();
        let data = dataset.data();
        for (index, datum) in data.iter().enumerate() {
            let axis_value = key_accessor.call(datum, index, dataset);
            let key = axis_value.normalized_key();
            let value = value_accessor
                .call(datum, index, dataset)
                .as_number()
                .unwrap_or(f64::NAN);
            if !value.is_finite() {
                continue;
            }
            let bucket = if value >= 0.0 {
                &mut positive_offsets
            } else {
                &mut negative_offsets
            };
            let running = bucket.entry(key.clone()).or_insert(0.0);
            let offset = *running;
            *running += value;
            key_to_datum.insert(
                key,
                StackedDatum {
                    offset,
                    value,
                    axis_value,
                },
            );
        }
        drop(data);
        result.insert(dataset.id(), key_to_datum);
    }

    warn_on_key_mismatch(&result);
    result
}

/// The total extent over all stacked data, clamped to include the zero
/// baseline. An optional filter restricts which data are considered.
pub fn stacked_extent<D>(
    stacking_result: &StackingResult,
    datasets: &[Dataset<D>],
    key_accessor: &Accessor<D>,
    filter: Option<&DatumFilter<D>>,
) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;

    for dataset in datasets {
        let Some(key_to_datum) = stacking_result.get(&dataset.id()) else {
            continue;
        };
        let data = dataset.data();
        for (index, datum) in data.iter().enumerate() {
            if let Some(filter) = filter {
                if !filter(datum, index, dataset) {
                    continue;
                }
            }
            let key = key_accessor.call(datum, index, dataset).normalized_key();
            let Some(stacked) = key_to_datum.get(&key) else {
                continue;
            };
            let top = stacked.offset + stacked.value;
            min = min.min(top.min(stacked.offset));
            max = max.max(top.max(stacked.offset));
            seen = true;
        }
    }

    if !seen {
        return (0.0, 0.0);
    }
    (min.min(0.0), max.max(0.0))
}

fn warn_on_key_mismatch(result: &StackingResult) {
    let mut union: IndexSet<&String> = IndexSet::new();
    for key_to_datum in result.values() {
        union.extend(key_to_datum.keys());
    }
    let mismatched = result
        .values()
        .filter(|key_to_datum| key_to_datum.len() != union.len())
        .count();
    if mismatched > 0 {
        warn!(
            mismatched_datasets = mismatched,
            total_keys = union.len(),
            "stacked datasets do not share the same key set; stacking may be misaligned"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{StackingOrder, stack, stacked_extent};
    use crate::core::accessor::Accessor;
    use crate::core::dataset::Dataset;
    use crate::core::value::DomainValue;

    #[derive(Clone)]
    struct Row {
        k: &'static str,
        v: f64,
    }

    fn row_datasets(values: &[f64]) -> Vec<Dataset<Row>> {
        values
            .iter()
            .map(|value| Dataset::new(vec![Row { k: "x", v: *value }]))
            .collect()
    }

    fn key_accessor() -> Accessor<Row> {
        Accessor::field(|row: &Row| DomainValue::text(row.k))
    }

    fn value_accessor() -> Accessor<Row> {
        Accessor::number(|row: &Row| row.v)
    }

    #[test]
    fn mixed_sign_stacks_diverge_from_zero() {
        let datasets = row_datasets(&[3.0, -2.0, 5.0]);
        let result = stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::BottomUp,
        );

        let offsets: Vec<f64> = datasets
            .iter()
            .map(|dataset| result[&dataset.id()]["x"].offset)
            .collect();
        assert_eq!(offsets, vec![0.0, 0.0, 3.0]);

        let extent = stacked_extent(&result, &datasets, &key_accessor(), None);
        assert_eq!(extent, (-2.0, 8.0));
    }

    #[test]
    fn topdown_reverses_accumulation_only() {
        let datasets = row_datasets(&[1.0, 2.0]);
        let result = stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::TopDown,
        );
        // Second dataset is processed first, so the first dataset sits on top.
        assert_eq!(result[&datasets[0].id()]["x"].offset, 2.0);
        assert_eq!(result[&datasets[1].id()]["x"].offset, 0.0);
        // Result iteration still follows original dataset order.
        let ids: Vec<_> = result.keys().copied().collect();
        assert_eq!(ids, vec![datasets[0].id(), datasets[1].id()]);
    }

    #[test]
    fn non_finite_values_are_excluded() {
        let datasets = vec![Dataset::new(vec![
            Row { k: "x", v: 1.0 },
            Row { k: "x", v: f64::NAN },
        ])];
        let result = stack(
            &datasets,
            &key_accessor(),
            &value_accessor(),
            StackingOrder::BottomUp,
        );
        let stacked = &result[&datasets[0].id()]["x"];
        assert_eq!(stacked.value, 1.0);
        let extent = stacked_extent(&result, &datasets, &key_accessor(), None);
        assert_eq!(extent, (0.0, 1.0));
    }
}

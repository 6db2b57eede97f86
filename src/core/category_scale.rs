use indexmap::IndexSet;

use crate::core::value::{DomainValue, Extent};

/// Banded categorical scale state.
///
/// Band layout follows the usual band-scale arithmetic: with `n` categories,
/// `step = span / (n - inner + 2 * outer)`, `band = step * (1 - inner)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryState {
    domain: IndexSet<String>,
    range: (f64, f64),
    inner_padding: f64,
    outer_padding: f64,
}

impl Default for CategoryState {
    fn default() -> Self {
        Self {
            domain: IndexSet::new(),
            range: (0.0, 1.0),
            inner_padding: 0.15,
            outer_padding: 0.15,
        }
    }
}

impl CategoryState {
    #[must_use]
    pub fn domain(&self) -> Vec<String> {
        self.domain.iter().cloned().collect()
    }

    pub fn set_domain(&mut self, categories: impl IntoIterator<Item = String>) {
        self.domain = categories.into_iter().collect();
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    #[must_use]
    pub fn inner_padding(&self) -> f64 {
        self.inner_padding
    }

    #[must_use]
    pub fn outer_padding(&self) -> f64 {
        self.outer_padding
    }

    pub fn set_paddings(&mut self, inner: f64, outer: f64) {
        self.inner_padding = inner.clamp(0.0, 1.0);
        self.outer_padding = outer.max(0.0);
    }

    fn step(&self) -> f64 {
        let count = self.domain.len();
        if count == 0 {
            return 0.0;
        }
        let slots = count as f64 - self.inner_padding + 2.0 * self.outer_padding;
        if slots <= 0.0 {
            return 0.0;
        }
        (self.range.1 - self.range.0) / slots
    }

    /// Width of one category band in base range space.
    #[must_use]
    pub fn range_band(&self) -> f64 {
        self.step() * (1.0 - self.inner_padding)
    }

    /// Maps a category to the center of its band in base range space.
    /// Unknown categories map to the range start rather than failing.
    #[must_use]
    pub fn scale(&self, value: &DomainValue) -> f64 {
        let key = value.normalized_key();
        let Some(index) = self.domain.get_index_of(&key) else {
            return self.range.0;
        };
        let step = self.step();
        let band_start = self.range.0 + step * (self.outer_padding + index as f64);
        band_start + self.range_band() / 2.0
    }

    /// De-duplicated set of normalized keys, in first-seen order.
    #[must_use]
    pub fn extent_of_values(values: &[DomainValue]) -> Extent {
        let mut seen: IndexSet<String> = IndexSet::new();
        for value in values {
            seen.insert(value.normalized_key());
        }
        if seen.is_empty() {
            Extent::Empty
        } else {
            Extent::Categories(seen.into_iter().collect())
        }
    }
}

use crate::core::value::{DomainValue, Extent};

/// Default padding proportion applied on auto-domain.
pub const DEFAULT_PADDING_PROPORTION: f64 = 0.05;

/// Expansion applied to a single-value numeric domain.
const SINGLE_VALUE_EXPANSION: f64 = 1.0;

/// Quantitative scale state: a linear domain-to-range mapping.
///
/// The composable pan/zoom transform lives in [`crate::core::scale`], layered
/// on top of this base mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearState {
    domain: (f64, f64),
    range: (f64, f64),
    padding_proportion: f64,
}

impl Default for LinearState {
    fn default() -> Self {
        Self {
            domain: (0.0, 1.0),
            range: (0.0, 1.0),
            padding_proportion: DEFAULT_PADDING_PROPORTION,
        }
    }
}

impl LinearState {
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn set_domain(&mut self, domain: (f64, f64)) {
        self.domain = domain;
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    #[must_use]
    pub fn padding_proportion(&self) -> f64 {
        self.padding_proportion
    }

    pub fn set_padding_proportion(&mut self, proportion: f64) {
        self.padding_proportion = proportion.max(0.0);
    }

    /// Maps a domain value into base range space, extrapolating outside the
    /// domain. Never fails; degenerate domains map everything to the range
    /// start.
    #[must_use]
    pub fn scale(&self, value: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 || !span.is_finite() {
            return self.range.0;
        }
        let normalized = (value - self.domain.0) / span;
        self.range.0 + normalized * (self.range.1 - self.range.0)
    }

    /// Inverse of [`Self::scale`] in base range space.
    #[must_use]
    pub fn invert(&self, range_value: f64) -> f64 {
        let range_span = self.range.1 - self.range.0;
        if range_span == 0.0 || !range_span.is_finite() {
            return self.domain.0;
        }
        let normalized = (range_value - self.range.0) / range_span;
        self.domain.0 + normalized * (self.domain.1 - self.domain.0)
    }

    /// Min/max extent of the finite numeric inputs; empty otherwise.
    #[must_use]
    pub fn extent_of_values(values: &[DomainValue]) -> Extent {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for value in values {
            let Some(number) = value.as_number() else {
                continue;
            };
            if !number.is_finite() {
                continue;
            }
            min = min.min(number);
            max = max.max(number);
            seen = true;
        }
        if seen {
            Extent::Numeric { min, max }
        } else {
            Extent::Empty
        }
    }

    /// Computes the auto domain for the supplied included values.
    ///
    /// The union extent is padded by the padding proportion, except at ends
    /// whose exact value appears in `padding_exceptions` (used to keep e.g.
    /// a stacked-bar baseline unpadded). A single-value domain expands by a
    /// fixed amount; no values at all falls back to the default domain.
    #[must_use]
    pub fn auto_domain_for(
        &self,
        included_values: &[DomainValue],
        padding_exceptions: &[f64],
    ) -> (f64, f64) {
        let extent = Self::extent_of_values(included_values);
        let Extent::Numeric { min, max } = extent else {
            return (0.0, 1.0);
        };

        if min == max {
            return (min - SINGLE_VALUE_EXPANSION, max + SINGLE_VALUE_EXPANSION);
        }

        let pad = (max - min) * self.padding_proportion;
        let padded_min = if padding_exceptions.contains(&min) {
            min
        } else {
            min - pad
        };
        let padded_max = if padding_exceptions.contains(&max) {
            max
        } else {
            max + pad
        };
        (padded_min, padded_max)
    }
}

#[cfg(test)]
mod tests {
    use super::LinearState;
    use crate::core::value::{DomainValue, Extent};

    #[test]
    fn scale_extrapolates_outside_domain() {
        let mut state = LinearState::default();
        state.set_domain((0.0, 10.0));
        state.set_range((0.0, 100.0));
        assert_eq!(state.scale(5.0), 50.0);
        assert_eq!(state.scale(-5.0), -50.0);
        assert_eq!(state.scale(20.0), 200.0);
    }

    #[test]
    fn extent_skips_non_finite_and_text() {
        let extent = LinearState::extent_of_values(&[
            DomainValue::number(3.0),
            DomainValue::number(f64::NAN),
            DomainValue::text("x"),
            DomainValue::number(-1.0),
        ]);
        assert_eq!(extent, Extent::Numeric { min: -1.0, max: 3.0 });
    }

    #[test]
    fn auto_domain_pads_except_at_exception_values() {
        let state = LinearState::default();
        let values = [DomainValue::number(0.0), DomainValue::number(10.0)];
        let (min, max) = state.auto_domain_for(&values, &[0.0]);
        assert_eq!(min, 0.0);
        assert_eq!(max, 10.5);
    }

    #[test]
    fn single_value_domain_expands() {
        let state = LinearState::default();
        let values = [DomainValue::number(4.0), DomainValue::number(4.0)];
        assert_eq!(state.auto_domain_for(&values, &[]), (3.0, 5.0));
    }
}

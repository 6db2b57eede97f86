use serde::{Deserialize, Serialize};

/// A value produced by an accessor and consumed by scale domains.
///
/// Quantitative scales consume `Number`; categorical scales consume either
/// variant through `normalized_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainValue {
    Number(f64),
    Text(String),
}

impl DomainValue {
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn is_finite_number(&self) -> bool {
        matches!(self, Self::Number(value) if value.is_finite())
    }

    /// Canonical stringification used for stacking and category keys.
    ///
    /// Integer-valued numbers stringify without a fractional part, so the
    /// number `2.0` and the text `"2"` collide. That collision is a
    /// deliberate contract, not an accident.
    #[must_use]
    pub fn normalized_key(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(value) => normalize_number_key(*value),
        }
    }
}

impl From<f64> for DomainValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DomainValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for DomainValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn normalize_number_key(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    // Normalize -0.0 and integer-valued floats to a bare integer string.
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{value}")
}

/// The minimal bounding description of a collection of domain values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Extent {
    #[default]
    Empty,
    /// Min/max pair for quantitative values.
    Numeric { min: f64, max: f64 },
    /// De-duplicated value set, in first-seen order, for categorical values.
    Categories(Vec<String>),
}

impl Extent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Numeric { .. } => false,
            Self::Categories(categories) => categories.is_empty(),
        }
    }

    /// Flattens the extent back into domain values for included-values
    /// providers.
    #[must_use]
    pub fn values(&self) -> Vec<DomainValue> {
        match self {
            Self::Empty => Vec::new(),
            Self::Numeric { min, max } => {
                vec![DomainValue::Number(*min), DomainValue::Number(*max)]
            }
            Self::Categories(categories) => categories
                .iter()
                .map(|category| DomainValue::Text(category.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainValue, Extent};

    #[test]
    fn number_and_text_keys_collide_on_integers() {
        assert_eq!(DomainValue::number(2.0).normalized_key(), "2");
        assert_eq!(DomainValue::text("2").normalized_key(), "2");
        assert_eq!(DomainValue::number(2.5).normalized_key(), "2.5");
        assert_eq!(DomainValue::number(-0.0).normalized_key(), "0");
    }

    #[test]
    fn empty_extent_flattens_to_no_values() {
        assert!(Extent::Empty.values().is_empty());
        assert!(Extent::Empty.is_empty());
    }

    #[test]
    fn numeric_extent_flattens_to_min_max() {
        let extent = Extent::Numeric { min: -3.0, max: 5.0 };
        assert_eq!(
            extent.values(),
            vec![DomainValue::number(-3.0), DomainValue::number(5.0)]
        );
    }
}

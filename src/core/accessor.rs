use std::fmt;
use std::rc::Rc;

use crate::core::dataset::Dataset;
use crate::core::scale::Scale;
use crate::core::value::DomainValue;

/// Predicate restricting which data participate in a computation
/// (extent filtering, stacked-extent filtering).
pub type DatumFilter<D> = Rc<dyn Fn(&D, usize, &Dataset<D>) -> bool>;

/// A pure extraction function from `(datum, index, dataset)` to a value.
///
/// Accessors must be side-effect-free and deterministic for a fixed dataset
/// state; extent caching and memoization assume it.
pub struct Accessor<D> {
    f: Rc<dyn Fn(&D, usize, &Dataset<D>) -> DomainValue>,
}

impl<D> Clone for Accessor<D> {
    fn clone(&self) -> Self {
        Self { f: Rc::clone(&self.f) }
    }
}

impl<D> fmt::Debug for Accessor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor")
    }
}

impl<D> Accessor<D> {
    pub fn new(f: impl Fn(&D, usize, &Dataset<D>) -> DomainValue + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// An accessor that ignores the datum and always yields `value`.
    pub fn constant(value: impl Into<DomainValue>) -> Self {
        let value = value.into();
        Self::new(move |_, _, _| value.clone())
    }

    /// An accessor over the datum alone.
    pub fn field(f: impl Fn(&D) -> DomainValue + 'static) -> Self {
        Self::new(move |datum, _, _| f(datum))
    }

    /// A numeric accessor over the datum alone.
    pub fn number(f: impl Fn(&D) -> f64 + 'static) -> Self {
        Self::new(move |datum, _, _| DomainValue::Number(f(datum)))
    }

    #[must_use]
    pub fn call(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> DomainValue {
        (self.f)(datum, index, dataset)
    }
}

/// An accessor optionally paired with the scale that projects its output.
#[derive(Debug)]
pub struct AccessorScaleBinding<D> {
    pub accessor: Accessor<D>,
    pub scale: Option<Scale>,
}

impl<D> Clone for AccessorScaleBinding<D> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
            scale: self.scale.clone(),
        }
    }
}

impl<D> AccessorScaleBinding<D> {
    #[must_use]
    pub fn new(accessor: Accessor<D>, scale: Option<Scale>) -> Self {
        Self { accessor, scale }
    }

    /// Applies the accessor and, when a scale is bound, projects the result
    /// through it.
    #[must_use]
    pub fn project(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> DomainValue {
        let value = self.accessor.call(datum, index, dataset);
        match &self.scale {
            Some(scale) => DomainValue::Number(scale.scale(&value)),
            None => value,
        }
    }

    /// The scaled numeric projection, for position attributes.
    #[must_use]
    pub fn project_number(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> f64 {
        match self.project(datum, index, dataset) {
            DomainValue::Number(value) => value,
            DomainValue::Text(_) => f64::NAN,
        }
    }
}

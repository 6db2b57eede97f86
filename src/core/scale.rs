//! Shared scale handle consumed by the binding/extent engine.
//!
//! A `Scale` owns a domain, a range, listener and provider registries, and a
//! composable pan/zoom transform layered on top of the base mapping so that
//! interaction never mutates the semantic domain.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::trace;

use crate::core::category_scale::CategoryState;
use crate::core::linear_scale::LinearState;
use crate::core::observe::{CallbackSet, SubscriptionId};
use crate::core::value::{DomainValue, Extent};
use crate::error::{PlotError, PlotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScaleId(u64);

impl ScaleId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

fn next_scale_id() -> ScaleId {
    thread_local! {
        static NEXT: Cell<u64> = const { Cell::new(0) };
    }
    NEXT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ScaleId(id)
    })
}

/// Registration token for included-values / padding-exception providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

/// Callback a scale queries during auto-domain to gather all values that
/// must be representable in its domain.
pub type IncludedValuesProvider = Rc<dyn Fn(&Scale) -> Vec<DomainValue>>;

/// Callback supplying values exempt from auto-domain padding.
pub type PaddingExceptionsProvider = Rc<dyn Fn(&Scale) -> Vec<f64>>;

/// The composable transformation-space transform, applied in range space:
/// `pixel = m * base(value) + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform {
    m: f64,
    b: f64,
}

impl Transform {
    const IDENTITY: Self = Self { m: 1.0, b: 0.0 };

    fn apply(self, value: f64) -> f64 {
        self.m * value + self.b
    }

    fn invert(self, value: f64) -> f64 {
        if self.m == 0.0 {
            return self.b;
        }
        (value - self.b) / self.m
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ScaleKind {
    Linear(LinearState),
    Category(CategoryState),
}

pub struct Scale {
    inner: Rc<Inner>,
}

struct Inner {
    id: ScaleId,
    revision: Cell<u64>,
    kind: RefCell<ScaleKind>,
    transform: Cell<Transform>,
    callbacks: CallbackSet<Scale>,
    included_providers: RefCell<Vec<(ProviderId, IncludedValuesProvider)>>,
    padding_providers: RefCell<Vec<(ProviderId, PaddingExceptionsProvider)>>,
    next_provider_id: Cell<u64>,
    automatic: Cell<bool>,
    domain_update_in_progress: Cell<bool>,
}

impl Clone for Scale {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for Scale {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scale {}

impl Hash for Scale {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scale")
            .field("id", &self.inner.id)
            .field("revision", &self.inner.revision.get())
            .field("kind", &*self.inner.kind.borrow())
            .finish()
    }
}

impl Scale {
    fn from_kind(kind: ScaleKind) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: next_scale_id(),
                revision: Cell::new(0),
                kind: RefCell::new(kind),
                transform: Cell::new(Transform::IDENTITY),
                callbacks: CallbackSet::new(),
                included_providers: RefCell::new(Vec::new()),
                padding_providers: RefCell::new(Vec::new()),
                next_provider_id: Cell::new(0),
                automatic: Cell::new(true),
                domain_update_in_progress: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn linear() -> Self {
        Self::from_kind(ScaleKind::Linear(LinearState::default()))
    }

    #[must_use]
    pub fn category() -> Self {
        Self::from_kind(ScaleKind::Category(CategoryState::default()))
    }

    #[must_use]
    pub fn id(&self) -> ScaleId {
        self.inner.id
    }

    /// Monotonic update id; bumps on every domain/range/transform change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    #[must_use]
    pub fn is_quantitative(&self) -> bool {
        matches!(&*self.inner.kind.borrow(), ScaleKind::Linear(_))
    }

    /// Banded-scale capability: the pixel width of one category band, or
    /// `None` for non-banded scales.
    #[must_use]
    pub fn range_band(&self) -> Option<f64> {
        match &*self.inner.kind.borrow() {
            ScaleKind::Category(state) => {
                Some(state.range_band() * self.inner.transform.get().m.abs())
            }
            ScaleKind::Linear(_) => None,
        }
    }

    /// Maps a domain value to a range value, applying the pan/zoom
    /// transform. Extrapolates outside the domain; never fails.
    #[must_use]
    pub fn scale(&self, value: &DomainValue) -> f64 {
        let base = match &*self.inner.kind.borrow() {
            ScaleKind::Linear(state) => state.scale(value.as_number().unwrap_or(f64::NAN)),
            ScaleKind::Category(state) => state.scale(value),
        };
        self.inner.transform.get().apply(base)
    }

    /// Inverse mapping from range space back to a numeric domain value.
    /// `None` for scales without a unique inverse (category bands).
    #[must_use]
    pub fn invert(&self, range_value: f64) -> Option<f64> {
        let pre_transform = self.inner.transform.get().invert(range_value);
        match &*self.inner.kind.borrow() {
            ScaleKind::Linear(state) => Some(state.invert(pre_transform)),
            ScaleKind::Category(_) => None,
        }
    }

    #[must_use]
    pub fn supports_inversion(&self) -> bool {
        self.is_quantitative()
    }

    #[must_use]
    pub fn domain(&self) -> Vec<DomainValue> {
        match &*self.inner.kind.borrow() {
            ScaleKind::Linear(state) => {
                let (start, end) = state.domain();
                vec![DomainValue::Number(start), DomainValue::Number(end)]
            }
            ScaleKind::Category(state) => state
                .domain()
                .into_iter()
                .map(DomainValue::Text)
                .collect(),
        }
    }

    /// Sets an explicit domain, disabling auto-domain mode until
    /// [`Self::auto_domain`] is called again.
    pub fn set_domain(&self, values: &[DomainValue]) -> PlotResult<()> {
        self.inner.automatic.set(false);
        let parsed = self.parse_domain(values)?;
        self.apply_domain(parsed);
        Ok(())
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        match &*self.inner.kind.borrow() {
            ScaleKind::Linear(state) => state.range(),
            ScaleKind::Category(state) => state.range(),
        }
    }

    pub fn set_range(&self, range: (f64, f64)) {
        {
            let mut kind = self.inner.kind.borrow_mut();
            match &mut *kind {
                ScaleKind::Linear(state) => state.set_range(range),
                ScaleKind::Category(state) => state.set_range(range),
            }
        }
        self.bump_and_dispatch();
    }

    /// Domain-type-specific extent: min/max for quantitative, de-duplicated
    /// set for categorical. Empty/degenerate input yields an empty extent.
    #[must_use]
    pub fn extent_of_values(&self, values: &[DomainValue]) -> Extent {
        match &*self.inner.kind.borrow() {
            ScaleKind::Linear(_) => LinearState::extent_of_values(values),
            ScaleKind::Category(_) => CategoryState::extent_of_values(values),
        }
    }

    /// Padding proportion control for quantitative scales; categorical
    /// scales have no padding and reject the call.
    pub fn set_padding_proportion(&self, proportion: f64) -> PlotResult<()> {
        match &mut *self.inner.kind.borrow_mut() {
            ScaleKind::Linear(state) => {
                state.set_padding_proportion(proportion);
                Ok(())
            }
            ScaleKind::Category(_) => Err(PlotError::InvalidConfig(
                "padding proportion applies to quantitative scales only".to_owned(),
            )),
        }
    }

    pub fn on_update(&self, callback: impl Fn(&Scale) + 'static) -> SubscriptionId {
        self.inner.callbacks.add(callback)
    }

    pub fn off_update(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.remove(id)
    }

    pub fn add_included_values_provider(&self, provider: IncludedValuesProvider) -> ProviderId {
        let id = self.next_provider_id();
        self.inner.included_providers.borrow_mut().push((id, provider));
        self.auto_domain_if_automatic();
        id
    }

    pub fn remove_included_values_provider(&self, id: ProviderId) -> bool {
        let removed = {
            let mut providers = self.inner.included_providers.borrow_mut();
            let before = providers.len();
            providers.retain(|(provider_id, _)| *provider_id != id);
            providers.len() != before
        };
        if removed {
            self.auto_domain_if_automatic();
        }
        removed
    }

    pub fn add_padding_exceptions_provider(&self, provider: PaddingExceptionsProvider) -> ProviderId {
        let id = self.next_provider_id();
        self.inner.padding_providers.borrow_mut().push((id, provider));
        self.auto_domain_if_automatic();
        id
    }

    pub fn remove_padding_exceptions_provider(&self, id: ProviderId) -> bool {
        let removed = {
            let mut providers = self.inner.padding_providers.borrow_mut();
            let before = providers.len();
            providers.retain(|(provider_id, _)| *provider_id != id);
            providers.len() != before
        };
        if removed {
            self.auto_domain_if_automatic();
        }
        removed
    }

    /// Recomputes the domain from provider-supplied values and re-enables
    /// automatic mode.
    pub fn auto_domain(&self) {
        self.inner.automatic.set(true);
        self.recompute_auto_domain();
    }

    pub fn auto_domain_if_automatic(&self) {
        if self.inner.automatic.get() {
            self.recompute_auto_domain();
        }
    }

    // Transformation space -------------------------------------------------

    /// Maps a transformation-space value to the final range value.
    #[must_use]
    pub fn scale_transformation(&self, value: f64) -> f64 {
        self.inner.transform.get().apply(value)
    }

    /// Inverse of [`Self::scale_transformation`].
    #[must_use]
    pub fn inverted_transformation(&self, value: f64) -> f64 {
        self.inner.transform.get().invert(value)
    }

    /// The currently visible span expressed in domain units for quantitative
    /// scales, or in base range units for banded scales.
    #[must_use]
    pub fn transformation_domain(&self) -> (f64, f64) {
        let (range_start, range_end) = self.range();
        let transform = self.inner.transform.get();
        let start = transform.invert(range_start);
        let end = transform.invert(range_end);
        match &*self.inner.kind.borrow() {
            ScaleKind::Linear(state) => (state.invert(start), state.invert(end)),
            ScaleKind::Category(_) => (start, end),
        }
    }

    /// Translates the transformation space by `translate` range units.
    pub fn pan(&self, translate: f64) {
        let mut transform = self.inner.transform.get();
        transform.b += translate;
        self.inner.transform.set(transform);
        self.bump_and_dispatch();
    }

    /// Scales the transformation space by `amount` about `center` (a range
    /// value). Repeated zooms compose without touching the semantic domain.
    pub fn zoom(&self, amount: f64, center: f64) {
        let mut transform = self.inner.transform.get();
        transform.m *= amount;
        transform.b = transform.b * amount + center * (1.0 - amount);
        self.inner.transform.set(transform);
        self.bump_and_dispatch();
    }

    // Internals ------------------------------------------------------------

    fn next_provider_id(&self) -> ProviderId {
        let id = ProviderId(self.inner.next_provider_id.get());
        self.inner.next_provider_id.set(id.0 + 1);
        id
    }

    fn parse_domain(&self, values: &[DomainValue]) -> PlotResult<ScaleKind> {
        let kind = self.inner.kind.borrow();
        match &*kind {
            ScaleKind::Linear(state) => {
                let numbers: Vec<f64> = values
                    .iter()
                    .filter_map(DomainValue::as_number)
                    .filter(|number| number.is_finite())
                    .collect();
                let [start, end] = numbers[..] else {
                    return Err(PlotError::InvalidConfig(
                        "quantitative domain requires exactly two finite numbers".to_owned(),
                    ));
                };
                let mut state = state.clone();
                state.set_domain((start, end));
                Ok(ScaleKind::Linear(state))
            }
            ScaleKind::Category(state) => {
                let mut state = state.clone();
                state.set_domain(values.iter().map(DomainValue::normalized_key));
                Ok(ScaleKind::Category(state))
            }
        }
    }

    fn recompute_auto_domain(&self) {
        let included = self.collect_included_values();
        let next = {
            let kind = self.inner.kind.borrow();
            match &*kind {
                ScaleKind::Linear(state) => {
                    let exceptions = self.collect_padding_exceptions();
                    let mut next = state.clone();
                    next.set_domain(state.auto_domain_for(&included, &exceptions));
                    ScaleKind::Linear(next)
                }
                ScaleKind::Category(state) => {
                    let mut next = state.clone();
                    match CategoryState::extent_of_values(&included) {
                        Extent::Categories(categories) => next.set_domain(categories),
                        _ => next.set_domain(Vec::new()),
                    }
                    ScaleKind::Category(next)
                }
            }
        };
        self.apply_domain(next);
    }

    fn collect_included_values(&self) -> Vec<DomainValue> {
        let providers: Vec<IncludedValuesProvider> = self
            .inner
            .included_providers
            .borrow()
            .iter()
            .map(|(_, provider)| Rc::clone(provider))
            .collect();
        let mut values = Vec::new();
        for provider in providers {
            values.extend(provider(self));
        }
        values
    }

    fn collect_padding_exceptions(&self) -> Vec<f64> {
        let providers: Vec<PaddingExceptionsProvider> = self
            .inner
            .padding_providers
            .borrow()
            .iter()
            .map(|(_, provider)| Rc::clone(provider))
            .collect();
        let mut values = Vec::new();
        for provider in providers {
            values.extend(provider(self));
        }
        values
    }

    /// Installs a new domain under the re-entrancy guard.
    ///
    /// A nested domain modification arriving via the notification cascade is
    /// suppressed; the outermost requested domain wins.
    fn apply_domain(&self, next: ScaleKind) {
        if self.inner.domain_update_in_progress.get() {
            trace!(scale_id = self.inner.id.0, "nested domain update suppressed");
            return;
        }
        let changed = {
            let kind = self.inner.kind.borrow();
            *kind != next
        };
        if !changed {
            return;
        }
        self.inner.domain_update_in_progress.set(true);
        *self.inner.kind.borrow_mut() = next;
        self.bump_and_dispatch();
        self.inner.domain_update_in_progress.set(false);
    }

    fn bump_and_dispatch(&self) {
        self.inner.revision.set(self.inner.revision.get() + 1);
        let handle = self.clone();
        self.inner.callbacks.dispatch(&handle);
    }
}

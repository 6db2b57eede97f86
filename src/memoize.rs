//! Signature-based single-slot memoization.
//!
//! Mutable shared objects (datasets, scales) are signed by their identity
//! plus update id instead of by deep value, so a cached computation is
//! reused exactly until one of its inputs actually changes.

use ordered_float::OrderedFloat;

use crate::core::dataset::Dataset;
use crate::core::scale::Scale;
use crate::error::{PlotError, PlotResult};

/// An immutable snapshot of a computation's inputs.
///
/// Numbers are compared bit-stably, plain data deeply, and shared objects by
/// `(identity, update id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Number(OrderedFloat<f64>),
    Text(String),
    List(Vec<Signature>),
    /// Identity-compared object (reference equality stand-in).
    Reference(u64),
    /// Mutable shared object: identity plus update id.
    Revision { id: u64, revision: u64 },
}

impl Signature {
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(OrderedFloat(value))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Signature>) -> Self {
        Self::List(items.into_iter().collect())
    }

    #[must_use]
    pub fn numbers(values: impl IntoIterator<Item = f64>) -> Self {
        Self::List(values.into_iter().map(Self::number).collect())
    }

    #[must_use]
    pub fn dataset<D>(dataset: &Dataset<D>) -> Self {
        Self::Revision {
            id: dataset.id().raw(),
            revision: dataset.revision(),
        }
    }

    #[must_use]
    pub fn scale(scale: &Scale) -> Self {
        Self::Revision {
            id: scale.id().raw(),
            revision: scale.revision(),
        }
    }
}

/// A memoized value recomputed only when its input signature differs.
#[derive(Debug)]
pub struct Memoized<T> {
    slot: Option<(Signature, T)>,
    locked: bool,
    compute_count: u64,
}

impl<T> Default for Memoized<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Memoized<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: None,
            locked: false,
            compute_count: 0,
        }
    }

    /// Returns the cached value, recomputing it when `signature` differs
    /// from the last call. While locked, signing is bypassed and the cached
    /// value is returned as-is (a first call while locked still computes).
    pub fn get(&mut self, signature: Signature, compute: impl FnOnce() -> T) -> &T {
        let hit = match &self.slot {
            Some(_) if self.locked => true,
            Some((last, _)) => *last == signature,
            None => false,
        };
        if !hit {
            self.compute_count += 1;
            self.slot = Some((signature, compute()));
        }
        match &self.slot {
            Some((_, value)) => value,
            // The slot is filled on the miss path above.
            None => unreachable!("memoized slot filled before read"),
        }
    }

    /// Locks the cache so subsequent `get` calls skip signing.
    /// Locking an already-locked cache is a programmer error.
    pub fn lock(&mut self) -> PlotResult<()> {
        if self.locked {
            return Err(PlotError::MemoizeAlreadyLocked);
        }
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of times the compute closure has actually run.
    #[must_use]
    pub fn compute_count(&self) -> u64 {
        self.compute_count
    }

    /// Drops the cached value so the next `get` recomputes.
    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

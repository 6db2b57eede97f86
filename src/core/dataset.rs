use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::core::observe::{CallbackSet, SubscriptionId};

/// Identity token for a dataset handle. Two handles cloned from the same
/// `Dataset::new` call share one id; equality and hashing use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(u64);

impl DatasetId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

fn next_dataset_id() -> DatasetId {
    thread_local! {
        static NEXT: Cell<u64> = const { Cell::new(0) };
    }
    NEXT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        DatasetId(id)
    })
}

/// An ordered sequence of data items plus out-of-band metadata.
///
/// The handle is cheap to clone and identity-based: the same dataset may be
/// added to multiple plots, and each mutation synchronously notifies every
/// subscriber. The revision counter bumps before subscribers run, so no
/// callback ever observes a torn state.
pub struct Dataset<D> {
    inner: Rc<Inner<D>>,
}

struct Inner<D> {
    id: DatasetId,
    revision: Cell<u64>,
    data: RefCell<Vec<D>>,
    metadata: RefCell<serde_json::Value>,
    callbacks: CallbackSet<Dataset<D>>,
}

impl<D> Clone for Dataset<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D> PartialEq for Dataset<D> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<D> Eq for Dataset<D> {}

impl<D> Hash for Dataset<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<D> fmt::Debug for Dataset<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.inner.id)
            .field("revision", &self.inner.revision.get())
            .field("len", &self.inner.data.borrow().len())
            .finish()
    }
}

impl<D> Dataset<D> {
    #[must_use]
    pub fn new(data: Vec<D>) -> Self {
        Self::with_metadata(data, serde_json::Value::Null)
    }

    #[must_use]
    pub fn with_metadata(data: Vec<D>, metadata: serde_json::Value) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: next_dataset_id(),
                revision: Cell::new(0),
                data: RefCell::new(data),
                metadata: RefCell::new(metadata),
                callbacks: CallbackSet::new(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DatasetId {
        self.inner.id
    }

    /// Monotonic update id; bumps on every data or metadata mutation.
    /// Usable as a memoization signature component.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    #[must_use]
    pub fn data(&self) -> Ref<'_, [D]> {
        Ref::map(self.inner.data.borrow(), Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the item sequence and notifies all subscribers.
    pub fn set_data(&self, data: Vec<D>) {
        {
            let mut slot = self.inner.data.borrow_mut();
            *slot = data;
        }
        debug!(
            dataset_id = self.inner.id.0,
            count = self.len(),
            "set dataset data"
        );
        self.bump_and_notify();
    }

    #[must_use]
    pub fn metadata(&self) -> Ref<'_, serde_json::Value> {
        self.inner.metadata.borrow()
    }

    /// Replaces the metadata value and notifies all subscribers.
    pub fn set_metadata(&self, metadata: serde_json::Value) {
        {
            let mut slot = self.inner.metadata.borrow_mut();
            *slot = metadata;
        }
        self.bump_and_notify();
    }

    pub fn on_update(&self, callback: impl Fn(&Dataset<D>) + 'static) -> SubscriptionId {
        self.inner.callbacks.add(callback)
    }

    pub fn off_update(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.remove(id)
    }

    fn bump_and_notify(&self) {
        self.inner.revision.set(self.inner.revision.get() + 1);
        let handle = self.clone();
        self.inner.callbacks.dispatch(&handle);
    }
}

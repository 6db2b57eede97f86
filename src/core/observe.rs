//! Re-entrancy-safe subscriber registry.
//!
//! Dispatch iterates a stable snapshot of the callbacks registered at the
//! start of the round. Callbacks added during dispatch run from the next
//! round onward; callbacks removed during dispatch still run in the current
//! round. A callback removing itself never affects delivery to the others.

use std::cell::RefCell;
use std::rc::Rc;

/// Token returned by `add`, used to unsubscribe.
///
/// Closures are not comparable in Rust, so unsubscription is id-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<A> = Rc<dyn Fn(&A)>;

pub struct CallbackSet<A> {
    inner: RefCell<Inner<A>>,
}

struct Inner<A> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<A>)>,
    // > 0 while a dispatch round is running (possibly nested).
    dispatch_depth: u32,
    pending: Vec<Pending<A>>,
}

enum Pending<A> {
    Add(SubscriptionId, Callback<A>),
    Remove(SubscriptionId),
}

impl<A> Default for CallbackSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> CallbackSet<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                next_id: 0,
                entries: Vec::new(),
                dispatch_depth: 0,
                pending: Vec::new(),
            }),
        }
    }

    pub fn add(&self, callback: impl Fn(&A) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        let callback: Callback<A> = Rc::new(callback);
        if inner.dispatch_depth > 0 {
            inner.pending.push(Pending::Add(id, callback));
        } else {
            inner.entries.push((id, callback));
        }
        id
    }

    /// Removes a subscription. Returns `false` when the id is unknown.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let known = inner.entries.iter().any(|(entry_id, _)| *entry_id == id)
            || inner
                .pending
                .iter()
                .any(|pending| matches!(pending, Pending::Add(added, _) if *added == id));
        if !known {
            return false;
        }
        if inner.dispatch_depth > 0 {
            inner.pending.push(Pending::Remove(id));
        } else {
            inner.entries.retain(|(entry_id, _)| *entry_id != id);
        }
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every currently-subscribed callback, in subscription order.
    pub fn dispatch(&self, arg: &A) {
        let snapshot: Vec<Callback<A>> = {
            let mut inner = self.inner.borrow_mut();
            inner.dispatch_depth += 1;
            inner
                .entries
                .iter()
                .map(|(_, callback)| Rc::clone(callback))
                .collect()
        };

        for callback in &snapshot {
            callback(arg);
        }

        let mut inner = self.inner.borrow_mut();
        inner.dispatch_depth -= 1;
        if inner.dispatch_depth == 0 {
            let pending = std::mem::take(&mut inner.pending);
            for change in pending {
                match change {
                    Pending::Add(id, callback) => inner.entries.push((id, callback)),
                    Pending::Remove(id) => inner.entries.retain(|(entry_id, _)| *entry_id != id),
                }
            }
        }
    }
}

//! Recording drawer used by tests and headless embedding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::dataset::Dataset;
use crate::render::drawer::{DrawStep, Drawer, DrawerFactory, SelectionHandle};

fn next_drawer_id() -> u64 {
    thread_local! {
        static NEXT: Cell<u64> = const { Cell::new(0) };
    }
    NEXT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

#[derive(Debug, Default)]
struct State {
    draw_count: Cell<u64>,
    last_indices: RefCell<Vec<usize>>,
    last_step_count: Cell<usize>,
    removed: Cell<bool>,
    /// Fixed duration reported per draw, for post-paint-hook tests.
    draw_time_ms: Cell<f64>,
}

/// A drawer that renders nothing and records what it was asked to do.
/// Cloned handles observe the same underlying state.
#[derive(Debug, Clone)]
pub struct NullDrawer {
    id: u64,
    state: Rc<State>,
}

impl Default for NullDrawer {
    fn default() -> Self {
        Self::new()
    }
}

impl NullDrawer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_drawer_id(),
            state: Rc::new(State::default()),
        }
    }

    pub fn set_draw_time_ms(&self, duration: f64) {
        self.state.draw_time_ms.set(duration);
    }

    #[must_use]
    pub fn draw_count(&self) -> u64 {
        self.state.draw_count.get()
    }

    #[must_use]
    pub fn last_indices(&self) -> Vec<usize> {
        self.state.last_indices.borrow().clone()
    }

    #[must_use]
    pub fn last_step_count(&self) -> usize {
        self.state.last_step_count.get()
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.state.removed.get()
    }
}

impl<D> Drawer<D> for NullDrawer {
    fn draw(&mut self, _dataset: &Dataset<D>, indices: &[usize], steps: &[DrawStep<D>]) {
        self.state.draw_count.set(self.state.draw_count.get() + 1);
        *self.state.last_indices.borrow_mut() = indices.to_vec();
        self.state.last_step_count.set(steps.len());
    }

    fn total_draw_time(&self, _indices: &[usize], _steps: &[DrawStep<D>]) -> f64 {
        self.state.draw_time_ms.get()
    }

    fn selection_for_index(&self, index: usize) -> SelectionHandle {
        SelectionHandle {
            drawer_id: self.id,
            index,
        }
    }

    fn remove(&mut self) {
        self.state.removed.set(true);
    }
}

/// Factory producing [`NullDrawer`]s and retaining a handle to each, so
/// tests can assert against the drawers a plot created internally.
#[derive(Debug, Clone, Default)]
pub struct NullDrawerRegistry {
    drawers: Rc<RefCell<Vec<NullDrawer>>>,
}

impl NullDrawerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn factory<D: 'static>(&self) -> DrawerFactory<D> {
        let drawers = Rc::clone(&self.drawers);
        Rc::new(move |_dataset: &Dataset<D>| {
            let drawer = NullDrawer::new();
            drawers.borrow_mut().push(drawer.clone());
            Box::new(drawer)
        })
    }

    #[must_use]
    pub fn drawers(&self) -> Vec<NullDrawer> {
        self.drawers.borrow().clone()
    }
}

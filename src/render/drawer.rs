use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::dataset::Dataset;
use crate::core::value::DomainValue;
use crate::render::animator::Animator;

/// Projects one datum to the value of a named visual attribute.
pub type Projector<D> = Rc<dyn Fn(&D, usize, &Dataset<D>) -> DomainValue>;

/// Attribute name → projector table handed to drawers, in binding order.
pub type AttributeToProjector<D> = IndexMap<String, Projector<D>>;

/// One phase of a render: a projector table paired with the animator that
/// carries the elements into it.
pub struct DrawStep<D> {
    pub attr_to_projector: AttributeToProjector<D>,
    pub animator: Rc<dyn Animator>,
}

impl<D> Clone for DrawStep<D> {
    fn clone(&self) -> Self {
        Self {
            attr_to_projector: self.attr_to_projector.clone(),
            animator: Rc::clone(&self.animator),
        }
    }
}

impl<D> fmt::Debug for DrawStep<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStep")
            .field("attrs", &self.attr_to_projector.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Opaque handle to a drawn visual element, resolvable by the backend that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionHandle {
    pub drawer_id: u64,
    pub index: usize,
}

/// Opaque rendering backend contract. The engine works identically whatever
/// backend is plugged in.
pub trait Drawer<D> {
    /// Draws the data at `indices` (the plot's data-to-draw filter output)
    /// through each step in order.
    fn draw(&mut self, dataset: &Dataset<D>, indices: &[usize], steps: &[DrawStep<D>]);

    /// Total time the given draw would occupy, summed across steps.
    fn total_draw_time(&self, indices: &[usize], steps: &[DrawStep<D>]) -> f64 {
        steps
            .iter()
            .map(|step| step.animator.total_time(indices.len()))
            .sum()
    }

    /// Handle for the visual element at a valid-datum index.
    fn selection_for_index(&self, index: usize) -> SelectionHandle;

    /// Removes the drawer's render output.
    fn remove(&mut self);
}

/// Constructs a drawer for each dataset added to a plot.
pub type DrawerFactory<D> = Rc<dyn Fn(&Dataset<D>) -> Box<dyn Drawer<D>>>;

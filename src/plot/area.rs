//! Area plot kind: a line filled down to a floor accessor, optionally
//! stacked.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::core::accessor::Accessor;
use crate::core::dataset::Dataset;
use crate::core::scale::Scale;
use crate::core::value::{DomainValue, Extent};
use crate::plot::line::DEFAULT_LINE_HIT_TOLERANCE;
use crate::plot::plot::Plot;
use crate::plot::xy::XyPlot;
use crate::stacking::{self, StackingOrder, StackingResult};

struct AreaShared<D> {
    xy: XyPlot<D>,
    stacking: Cell<Option<StackingOrder>>,
}

/// Line plot with a filled region between `y` and a floor `y0`
/// (constant zero unless rebound).
pub struct AreaPlot<D> {
    shared: Rc<AreaShared<D>>,
}

impl<D> Clone for AreaPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for AreaPlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> AreaPlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(AreaShared {
            xy: XyPlot::new(),
            stacking: Cell::new(None),
        });
        let area = Self { shared };
        area.plot().set_hit_tolerance(DEFAULT_LINE_HIT_TOLERANCE);
        area.plot()
            .bind_property("y0", Accessor::constant(0.0), None);
        area
    }

    #[must_use]
    pub fn xy(&self) -> &XyPlot<D> {
        &self.shared.xy
    }

    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        self.shared.xy.plot()
    }

    pub fn set_x(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_x(accessor, scale);
    }

    /// Binds `y` and rebinds `y0` to the same scale, so the floor always
    /// participates in the y extents.
    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        let y0 = self
            .plot()
            .property("y0")
            .map(|binding| binding.accessor)
            .unwrap_or_else(|| Accessor::constant(0.0));
        self.shared.xy.set_y(accessor, scale.clone());
        self.plot().bind_property("y0", y0, scale);
    }

    /// Binds the floor of the filled region.
    pub fn set_y0(&self, accessor: Accessor<D>) {
        let scale = self.shared.xy.y().and_then(|binding| binding.scale);
        self.plot().bind_property("y0", accessor, scale);
    }

    #[must_use]
    pub fn y0(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> f64 {
        let base = self.stack_offset(datum, index, dataset);
        match self.plot().property("y0") {
            Some(binding) if self.shared.stacking.get().is_none() => binding
                .accessor
                .call(datum, index, dataset)
                .as_number()
                .unwrap_or(0.0),
            _ => base,
        }
    }

    // Stacking -------------------------------------------------------------

    #[must_use]
    pub fn stacking(&self) -> Option<StackingOrder> {
        self.shared.stacking.get()
    }

    /// While stacked, each dataset's area floors on the accumulated total
    /// below it and the y extents become the stacked extent.
    pub fn set_stacking(&self, order: Option<StackingOrder>) {
        self.shared.stacking.set(order);
        match order {
            Some(_) => {
                let weak = Rc::downgrade(&self.shared);
                self.plot().set_extent_override(
                    "y",
                    Some(Rc::new(move || match weak.upgrade() {
                        Some(shared) => AreaPlot { shared }.stacked_y_extent(),
                        None => Vec::new(),
                    })),
                );
            }
            None => self.plot().set_extent_override("y", None),
        }
        debug!(?order, "area stacking changed");
        self.plot().update_extents();
        self.plot().request_render();
    }

    #[must_use]
    pub fn stacking_result(&self) -> StackingResult {
        let Some(order) = self.shared.stacking.get() else {
            return StackingResult::new();
        };
        let (Some(x), Some(y)) = (self.shared.xy.x(), self.shared.xy.y()) else {
            return StackingResult::new();
        };
        stacking::stack(&self.plot().datasets(), &x.accessor, &y.accessor, order)
    }

    fn stacked_y_extent(&self) -> Vec<Extent> {
        let Some(x) = self.shared.xy.x() else {
            return Vec::new();
        };
        let result = self.stacking_result();
        let filter = self.plot().property_filter("y");
        let (min, max) = stacking::stacked_extent(
            &result,
            &self.plot().datasets(),
            &x.accessor,
            filter.as_ref(),
        );
        vec![Extent::Numeric { min, max }]
    }

    fn stack_offset(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> f64 {
        if self.shared.stacking.get().is_none() {
            return 0.0;
        }
        let Some(x) = self.shared.xy.x() else {
            return 0.0;
        };
        let key = x.accessor.call(datum, index, dataset).normalized_key();
        self.stacking_result()
            .get(&dataset.id())
            .and_then(|keyed| keyed.get(&key))
            .map(|stacked| stacked.offset)
            .unwrap_or(0.0)
    }

    /// The stacked y value (offset + contribution) in pixel space, for
    /// backends that draw the upper edge of each band.
    #[must_use]
    pub fn stacked_y_pixel(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> f64 {
        let Some(y) = self.shared.xy.y() else {
            return f64::NAN;
        };
        let Some(scale) = &y.scale else {
            return f64::NAN;
        };
        let raw = y.accessor.call(datum, index, dataset).as_number().unwrap_or(f64::NAN);
        let offset = self.stack_offset(datum, index, dataset);
        scale.scale(&DomainValue::Number(offset + raw))
    }

    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

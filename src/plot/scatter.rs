//! Scatter plot kind: one symbol per datum, hit-tested by bounding box.

use std::rc::{Rc, Weak};

use crate::core::accessor::Accessor;
use crate::core::geometry::{Bounds, EntityGeometry, Point};
use crate::core::scale::Scale;
use crate::entity::LightweightPlotEntity;
use crate::plot::plot::Plot;
use crate::plot::xy::XyPlot;

pub const DEFAULT_SYMBOL_SIZE: f64 = 6.0;

struct ScatterShared<D> {
    xy: XyPlot<D>,
}

pub struct ScatterPlot<D> {
    shared: Rc<ScatterShared<D>>,
}

impl<D> Clone for ScatterPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for ScatterPlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> ScatterPlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(ScatterShared { xy: XyPlot::new() });
        let scatter = Self { shared };
        scatter
            .plot()
            .bind_property("size", Accessor::constant(DEFAULT_SYMBOL_SIZE), None);
        scatter.install_geometry();
        scatter
    }

    fn install_geometry(&self) {
        let weak: Weak<ScatterShared<D>> = Rc::downgrade(&self.shared);
        self.plot()
            .set_entity_geometry(Some(Rc::new(move |entity: &LightweightPlotEntity<D>| {
                let Some(shared) = weak.upgrade() else {
                    return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
                };
                let scatter = ScatterPlot { shared };
                scatter.symbol_bounds(entity)
            })));
    }

    /// The symbol's pixel bounding box: a square of the projected size,
    /// centered on the datum's position.
    fn symbol_bounds(&self, entity: &LightweightPlotEntity<D>) -> EntityGeometry {
        let data = entity.dataset.data();
        let Some(datum) = data.get(entity.index) else {
            return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
        };
        let center = self
            .plot()
            .pixel_point(datum, entity.index, &entity.dataset);
        let size = self
            .plot()
            .property("size")
            .map(|binding| binding.project_number(datum, entity.index, &entity.dataset))
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(DEFAULT_SYMBOL_SIZE);
        let half = size / 2.0;
        EntityGeometry::Rect(Bounds::from_ranges(
            (center.x - half, center.x + half),
            (center.y - half, center.y + half),
        ))
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

    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_y(accessor, scale);
    }

    /// Binds the symbol size in pixels (optionally through a scale).
    pub fn set_size(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.plot().bind_property("size", accessor, scale);
    }

    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

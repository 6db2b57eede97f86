//! Rectangle plot kind: one axis-aligned rectangle per datum, spanning
//! `x..x2` by `y..y2`.

use std::rc::{Rc, Weak};

use crate::core::accessor::{Accessor, AccessorScaleBinding};
use crate::core::dataset::Dataset;
use crate::core::geometry::{Bounds, EntityGeometry, Point};
use crate::core::scale::Scale;
use crate::entity::LightweightPlotEntity;
use crate::plot::plot::{PixelPointFn, Plot};
use crate::plot::xy::XyPlot;

struct RectangleShared<D> {
    xy: XyPlot<D>,
}

/// Grid/heatmap-style rectangles. When a secondary bound (`x2`/`y2`) is
/// absent and the primary scale is banded, the band width fills it in.
pub struct RectanglePlot<D> {
    shared: Rc<RectangleShared<D>>,
}

impl<D> Clone for RectanglePlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for RectanglePlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> RectanglePlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(RectangleShared { xy: XyPlot::new() });
        let rectangle = Self { shared };
        rectangle.install_geometry();
        rectangle.plot().set_pixel_point(rectangle.center_pixel_point());
        rectangle
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

    /// Binds the far x edge, sharing the x scale.
    pub fn set_x2(&self, accessor: Accessor<D>) {
        let scale = self.shared.xy.x().and_then(|binding| binding.scale);
        self.plot().bind_property("x2", accessor, scale);
    }

    /// Binds the far y edge, sharing the y scale.
    pub fn set_y2(&self, accessor: Accessor<D>) {
        let scale = self.shared.xy.y().and_then(|binding| binding.scale);
        self.plot().bind_property("y2", accessor, scale);
    }

    fn install_geometry(&self) {
        let weak: Weak<RectangleShared<D>> = Rc::downgrade(&self.shared);
        self.plot()
            .set_entity_geometry(Some(Rc::new(move |entity: &LightweightPlotEntity<D>| {
                let Some(shared) = weak.upgrade() else {
                    return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
                };
                let rectangle = RectanglePlot { shared };
                let data = entity.dataset.data();
                match data.get(entity.index) {
                    Some(datum) => rectangle.rect_geometry(datum, entity.index, &entity.dataset),
                    None => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
                }
            })));
    }

    fn center_pixel_point(&self) -> PixelPointFn<D> {
        let weak = Rc::downgrade(&self.shared);
        Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            RectanglePlot { shared }
                .rect_geometry(datum, index, dataset)
                .position()
        })
    }

    /// One axis' pixel span: `primary..secondary`, or the primary's band
    /// centered on it when no secondary edge is bound.
    fn edge_range(
        primary: &AccessorScaleBinding<D>,
        secondary: Option<&AccessorScaleBinding<D>>,
        datum: &D,
        index: usize,
        dataset: &Dataset<D>,
    ) -> Option<(f64, f64)> {
        let start = primary.project_number(datum, index, dataset);
        if !start.is_finite() {
            return None;
        }
        if let Some(secondary) = secondary {
            let end = secondary.project_number(datum, index, dataset);
            return end.is_finite().then_some((start, end));
        }
        let band = primary.scale.as_ref().and_then(Scale::range_band)?;
        Some((start - band / 2.0, start + band / 2.0))
    }

    fn rect_geometry(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> EntityGeometry {
        let Some(x) = self.shared.xy.x() else {
            return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
        };
        let Some(y) = self.shared.xy.y() else {
            return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
        };
        let x2 = self.plot().property("x2");
        let y2 = self.plot().property("y2");
        let x_range = Self::edge_range(&x, x2.as_ref(), datum, index, dataset);
        let y_range = Self::edge_range(&y, y2.as_ref(), datum, index, dataset);
        match (x_range, y_range) {
            (Some(x_range), Some(y_range)) => {
                EntityGeometry::Rect(Bounds::from_ranges(x_range, y_range))
            }
            _ => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
        }
    }

    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

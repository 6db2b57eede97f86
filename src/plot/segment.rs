//! Segment plot kind: one line segment per datum.

use std::rc::{Rc, Weak};

use crate::core::accessor::Accessor;
use crate::core::dataset::Dataset;
use crate::core::geometry::{EntityGeometry, Point};
use crate::core::scale::Scale;
use crate::entity::LightweightPlotEntity;
use crate::plot::plot::{PixelPointFn, Plot};
use crate::plot::xy::XyPlot;

pub const DEFAULT_SEGMENT_HIT_TOLERANCE: f64 = 5.0;

struct SegmentShared<D> {
    xy: XyPlot<D>,
}

/// Independent segments from `(x, y)` to `(x2, y2)`. A missing `x2`/`y2`
/// falls back to the near endpoint, degenerating to a point mark.
///
/// Region queries report segments that cross the region even when both
/// endpoints lie outside it.
pub struct SegmentPlot<D> {
    shared: Rc<SegmentShared<D>>,
}

impl<D> Clone for SegmentPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for SegmentPlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> SegmentPlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(SegmentShared { xy: XyPlot::new() });
        let segment = Self { shared };
        segment.plot().set_hit_tolerance(DEFAULT_SEGMENT_HIT_TOLERANCE);
        segment.install_geometry();
        segment.plot().set_pixel_point(segment.midpoint_pixel_point());
        segment
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

    pub fn set_x2(&self, accessor: Accessor<D>) {
        let scale = self.shared.xy.x().and_then(|binding| binding.scale);
        self.plot().bind_property("x2", accessor, scale);
    }

    pub fn set_y2(&self, accessor: Accessor<D>) {
        let scale = self.shared.xy.y().and_then(|binding| binding.scale);
        self.plot().bind_property("y2", accessor, scale);
    }

    fn install_geometry(&self) {
        let weak: Weak<SegmentShared<D>> = Rc::downgrade(&self.shared);
        self.plot()
            .set_entity_geometry(Some(Rc::new(move |entity: &LightweightPlotEntity<D>| {
                let Some(shared) = weak.upgrade() else {
                    return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
                };
                let segment = SegmentPlot { shared };
                let data = entity.dataset.data();
                match data.get(entity.index) {
                    Some(datum) => segment.segment_geometry(datum, entity.index, &entity.dataset),
                    None => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
                }
            })));
    }

    fn midpoint_pixel_point(&self) -> PixelPointFn<D> {
        let weak = Rc::downgrade(&self.shared);
        Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            SegmentPlot { shared }
                .segment_geometry(datum, index, dataset)
                .position()
        })
    }

    fn segment_geometry(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> EntityGeometry {
        let (Some(x), Some(y)) = (self.shared.xy.x(), self.shared.xy.y()) else {
            return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
        };
        let start = Point::new(
            x.project_number(datum, index, dataset),
            y.project_number(datum, index, dataset),
        );
        let end = Point::new(
            self.plot()
                .property("x2")
                .map(|binding| binding.project_number(datum, index, dataset))
                .unwrap_or(start.x),
            self.plot()
                .property("y2")
                .map(|binding| binding.project_number(datum, index, dataset))
                .unwrap_or(start.y),
        );
        if !start.is_finite() || !end.is_finite() {
            return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
        }
        EntityGeometry::Segment { start, end }
    }

    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

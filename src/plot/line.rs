//! Connected-line plot kind.

use crate::core::accessor::Accessor;
use crate::core::geometry::Point;
use crate::core::scale::Scale;
use crate::plot::plot::{Plot, PlotEntity};
use crate::plot::xy::XyPlot;

/// Pixels within which a pointer "touches" a line vertex.
pub const DEFAULT_LINE_HIT_TOLERANCE: f64 = 5.0;

/// A plot connecting each dataset's data in index order.
///
/// Entities are the line's vertices; hit-testing uses a pixel tolerance
/// around them rather than exact containment.
#[derive(Clone)]
pub struct LinePlot<D> {
    xy: XyPlot<D>,
}

impl<D: 'static> Default for LinePlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> LinePlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let xy = XyPlot::new();
        xy.plot().set_hit_tolerance(DEFAULT_LINE_HIT_TOLERANCE);
        Self { xy }
    }

    #[must_use]
    pub fn xy(&self) -> &XyPlot<D> {
        &self.xy
    }

    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        self.xy.plot()
    }

    pub fn set_x(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.xy.set_x(accessor, scale);
    }

    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.xy.set_y(accessor, scale);
    }
}

impl<D: Clone + 'static> LinePlot<D> {
    /// The entity nearest the query point by horizontal distance, with ties
    /// broken by vertical distance. This is the lookup interactions want on
    /// a line chart, where x is the browsing axis.
    #[must_use]
    pub fn entity_nearest_by_x_then_y(&self, query_point: Point) -> Option<PlotEntity<D>> {
        let mut best: Option<(PlotEntity<D>, f64, f64)> = None;
        for entity in self.plot().entities(None) {
            let dx = (entity.position.x - query_point.x).abs();
            let dy = (entity.position.y - query_point.y).abs();
            if !dx.is_finite() || !dy.is_finite() {
                continue;
            }
            let closer = match &best {
                Some((_, best_dx, best_dy)) => {
                    dx < *best_dx || (dx == *best_dx && dy < *best_dy)
                }
                None => true,
            };
            if closer {
                best = Some((entity, dx, dy));
            }
        }
        best.map(|(entity, _, _)| entity)
    }

    /// Consecutive vertex pairs per dataset, for backends drawing strokes.
    #[must_use]
    pub fn line_segments(&self) -> Vec<(Point, Point)> {
        let plot = self.plot();
        let mut segments = Vec::new();
        for dataset in plot.datasets() {
            let entities = plot.entities(Some(std::slice::from_ref(&dataset)));
            for pair in entities.windows(2) {
                segments.push((pair[0].position, pair[1].position));
            }
        }
        segments
    }

    pub fn destroy(&self) {
        self.xy.destroy();
    }
}

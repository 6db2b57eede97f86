//! Pie plot kind: one dataset partitioned into sectors by a value accessor.

use std::cell::Cell;
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::core::accessor::{Accessor, AccessorScaleBinding};
use crate::core::dataset::Dataset;
use crate::core::geometry::Point;
use crate::core::scale::Scale;
use crate::plot::plot::{PixelPointFn, Plot};

/// Angular span of one sector, in radians clockwise from twelve o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorAngles {
    pub start: f64,
    pub end: f64,
}

impl SectorAngles {
    #[must_use]
    pub fn mid(self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

struct PieShared<D> {
    plot: Plot<D>,
    inner_radius: Cell<f64>,
    outer_radius: Cell<Option<f64>>,
}

/// A single-dataset plot dividing the full circle proportionally to each
/// datum's sector value. Non-positive and non-finite values are excluded
/// and render no sector.
pub struct PiePlot<D> {
    shared: Rc<PieShared<D>>,
}

impl<D> Clone for PiePlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for PiePlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> PiePlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(PieShared {
            plot: Plot::new(),
            inner_radius: Cell::new(0.0),
            outer_radius: Cell::new(None),
        });
        let pie = Self { shared };
        pie.plot().set_pixel_point(pie.centroid_pixel_point());
        pie
    }

    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        &self.shared.plot
    }

    /// Adds the dataset. A pie renders exactly one dataset; further
    /// additions are ignored with a warning.
    pub fn add_dataset(&self, dataset: Dataset<D>) {
        if !self.shared.plot.datasets().is_empty() {
            warn!("pie plots render a single dataset; ignoring extra dataset");
            return;
        }
        self.shared.plot.add_dataset(dataset);
    }

    /// Replaces the rendered dataset.
    pub fn set_dataset(&self, dataset: Dataset<D>) {
        self.shared.plot.set_datasets(vec![dataset]);
    }

    fn dataset(&self) -> Option<Dataset<D>> {
        self.shared.plot.datasets().into_iter().next()
    }

    // Bindings and radii ---------------------------------------------------

    #[must_use]
    pub fn sector_value(&self) -> Option<AccessorScaleBinding<D>> {
        self.shared.plot.property("sector_value")
    }

    pub fn set_sector_value(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.plot.bind_property("sector_value", accessor, scale);
    }

    #[must_use]
    pub fn inner_radius(&self) -> f64 {
        self.shared.inner_radius.get()
    }

    pub fn set_inner_radius(&self, radius: f64) {
        self.shared.inner_radius.set(radius.max(0.0));
        self.shared.plot.request_render();
    }

    /// The outer radius in pixels: explicit if set, otherwise half the
    /// smaller plot dimension.
    #[must_use]
    pub fn outer_radius(&self) -> f64 {
        self.shared.outer_radius.get().unwrap_or_else(|| {
            let bounds = self.shared.plot.bounds();
            bounds.width().min(bounds.height()) / 2.0
        })
    }

    pub fn set_outer_radius(&self, radius: Option<f64>) {
        self.shared.outer_radius.set(radius.map(|radius| radius.max(0.0)));
        self.shared.plot.request_render();
    }

    #[must_use]
    pub fn center(&self) -> Point {
        let bounds = self.shared.plot.bounds();
        Point::new(
            bounds.top_left.x + bounds.width() / 2.0,
            bounds.top_left.y + bounds.height() / 2.0,
        )
    }

    // Sector layout --------------------------------------------------------

    /// Raw sector value per datum, `None` when the datum is excluded.
    fn sector_values(&self) -> Vec<Option<f64>> {
        let Some(dataset) = self.dataset() else {
            return Vec::new();
        };
        let Some(binding) = self.sector_value() else {
            return vec![None; dataset.len()];
        };
        let data = dataset.data();
        data.iter()
            .enumerate()
            .map(|(index, datum)| {
                binding
                    .accessor
                    .call(datum, index, &dataset)
                    .as_number()
                    .filter(|value| value.is_finite() && *value > 0.0)
            })
            .collect()
    }

    /// Per-datum angular spans. Excluded data get `None` and the remaining
    /// sectors still cover the full circle.
    #[must_use]
    pub fn sector_angles(&self) -> Vec<Option<SectorAngles>> {
        let values = self.sector_values();
        let total: f64 = values.iter().flatten().sum();
        if total <= 0.0 {
            return vec![None; values.len()];
        }
        let mut cumulative = 0.0;
        values
            .into_iter()
            .map(|value| {
                value.map(|value| {
                    let start = cumulative / total * TAU;
                    cumulative += value;
                    let end = cumulative / total * TAU;
                    SectorAngles { start, end }
                })
            })
            .collect()
    }

    /// Entity position: the sector's centroid at mid-angle, mid-radius.
    fn centroid_pixel_point(&self) -> PixelPointFn<D> {
        let weak: Weak<PieShared<D>> = Rc::downgrade(&self.shared);
        Rc::new(move |_datum: &D, index: usize, _dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            let pie = PiePlot { shared };
            let Some(Some(angles)) = pie.sector_angles().get(index).copied() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            let center = pie.center();
            let radius = (pie.inner_radius() + pie.outer_radius()) / 2.0;
            let mid = angles.mid();
            Point::new(
                center.x + radius * mid.sin(),
                center.y - radius * mid.cos(),
            )
        })
    }

    /// The datum index of the sector under the query point, if any.
    #[must_use]
    pub fn sector_at(&self, point: Point) -> Option<usize> {
        let center = self.center();
        let dx = point.x - center.x;
        let dy = point.y - center.y;
        let radius = (dx * dx + dy * dy).sqrt();
        if radius < self.inner_radius() || radius > self.outer_radius() {
            return None;
        }
        // Angle clockwise from twelve o'clock, matching sector layout.
        let angle = dx.atan2(-dy).rem_euclid(TAU);
        self.sector_angles()
            .iter()
            .position(|sector| {
                matches!(sector, Some(sector) if angle >= sector.start && angle < sector.end)
            })
    }

    pub fn destroy(&self) {
        self.shared.plot.destroy();
    }
}

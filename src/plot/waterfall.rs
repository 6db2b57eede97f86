//! Waterfall plot kind: running-total bars over a single dataset.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::core::accessor::Accessor;
use crate::core::dataset::Dataset;
use crate::core::geometry::{Bounds, EntityGeometry, Point};
use crate::core::scale::Scale;
use crate::core::value::{DomainValue, Extent};
use crate::entity::LightweightPlotEntity;
use crate::plot::bar::DEFAULT_BAR_PIXEL_WIDTH;
use crate::plot::plot::{PixelPointFn, Plot};
use crate::plot::xy::XyPlot;

struct WaterfallShared<D> {
    xy: XyPlot<D>,
    fixed_bar_width: Cell<f64>,
}

/// Vertical bars where each delta bar floors on the running total of the
/// data before it. A datum marked *total* re-anchors at zero instead, so
/// its bar shows the absolute running value.
pub struct WaterfallPlot<D> {
    shared: Rc<WaterfallShared<D>>,
}

impl<D> Clone for WaterfallPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for WaterfallPlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> WaterfallPlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let shared = Rc::new(WaterfallShared {
            xy: XyPlot::new(),
            fixed_bar_width: Cell::new(DEFAULT_BAR_PIXEL_WIDTH),
        });
        let waterfall = Self { shared };
        waterfall
            .plot()
            .bind_property("total", Accessor::constant(0.0), None);
        waterfall.install_extent_override();
        waterfall.install_geometry();
        waterfall.plot().set_pixel_point(waterfall.bar_top_pixel_point());
        waterfall
    }

    #[must_use]
    pub fn xy(&self) -> &XyPlot<D> {
        &self.shared.xy
    }

    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        self.shared.xy.plot()
    }

    /// Adds the dataset. The cumulative walk is defined over exactly one
    /// dataset; further additions are ignored with a warning.
    pub fn add_dataset(&self, dataset: Dataset<D>) {
        if !self.plot().datasets().is_empty() {
            warn!("waterfall plots render a single dataset; ignoring extra dataset");
            return;
        }
        self.plot().add_dataset(dataset);
    }

    /// Replaces the rendered dataset.
    pub fn set_dataset(&self, dataset: Dataset<D>) {
        self.plot().set_datasets(vec![dataset]);
    }

    pub fn set_x(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_x(accessor, scale);
    }

    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_y(accessor, scale);
    }

    /// Marks data as totals: the accessor is truthy (non-zero number) for
    /// bars that restate the running value rather than contribute a delta.
    pub fn set_total(&self, accessor: Accessor<D>) {
        self.plot().bind_property("total", accessor, None);
        self.plot().update_extents();
        self.plot().request_render();
    }

    pub fn set_fixed_bar_width(&self, width: f64) {
        self.shared.fixed_bar_width.set(width.max(0.0));
        self.plot().request_render();
    }

    // Cumulative walk ------------------------------------------------------

    fn is_total(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> bool {
        self.plot()
            .property("total")
            .map(|binding| {
                binding
                    .accessor
                    .call(datum, index, dataset)
                    .as_number()
                    .is_some_and(|value| value != 0.0)
            })
            .unwrap_or(false)
    }

    /// Domain-space `(floor, top)` of each bar, walked in index order over
    /// the first dataset. Data with a non-finite value get `None` and do
    /// not advance the running total.
    #[must_use]
    pub fn bar_spans(&self) -> Vec<Option<(f64, f64)>> {
        let Some(dataset) = self.plot().datasets().into_iter().next() else {
            return Vec::new();
        };
        let Some(y) = self.shared.xy.y() else {
            return Vec::new();
        };
        let data = dataset.data();
        let mut running = 0.0;
        data.iter()
            .enumerate()
            .map(|(index, datum)| {
                let value = y.accessor.call(datum, index, &dataset).as_number()?;
                if !value.is_finite() {
                    return None;
                }
                if self.is_total(datum, index, &dataset) {
                    running = value;
                    Some((0.0, value))
                } else {
                    let floor = running;
                    running += value;
                    Some((floor, running))
                }
            })
            .collect()
    }

    fn install_extent_override(&self) {
        let weak: Weak<WaterfallShared<D>> = Rc::downgrade(&self.shared);
        self.plot().set_extent_override(
            "y",
            Some(Rc::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return Vec::new();
                };
                let waterfall = WaterfallPlot { shared };
                let mut min: f64 = 0.0;
                let mut max: f64 = 0.0;
                for (floor, top) in waterfall.bar_spans().into_iter().flatten() {
                    min = min.min(floor).min(top);
                    max = max.max(floor).max(top);
                }
                vec![Extent::Numeric { min, max }]
            })),
        );
    }

    // Geometry -------------------------------------------------------------

    fn bar_width(&self) -> f64 {
        self.shared
            .xy
            .x()
            .and_then(|binding| binding.scale)
            .and_then(|scale| scale.range_band())
            .unwrap_or_else(|| self.shared.fixed_bar_width.get())
    }

    fn bar_ranges(
        &self,
        datum: &D,
        index: usize,
        dataset: &Dataset<D>,
    ) -> Option<((f64, f64), (f64, f64))> {
        // Spans are walked over the first dataset only; a datum from any
        // other dataset has no span.
        let first = self.plot().datasets().into_iter().next()?;
        if first.id() != dataset.id() {
            return None;
        }
        let x = self.shared.xy.x()?;
        let y_scale = self.shared.xy.y().and_then(|binding| binding.scale)?;
        let (floor, top) = self.bar_spans().get(index).copied().flatten()?;
        let center = x.project_number(datum, index, dataset);
        let floor_px = y_scale.scale(&DomainValue::Number(floor));
        let top_px = y_scale.scale(&DomainValue::Number(top));
        if !center.is_finite() || !floor_px.is_finite() || !top_px.is_finite() {
            return None;
        }
        let half = self.bar_width() / 2.0;
        Some(((center - half, center + half), (floor_px, top_px)))
    }

    fn install_geometry(&self) {
        let weak: Weak<WaterfallShared<D>> = Rc::downgrade(&self.shared);
        self.plot()
            .set_entity_geometry(Some(Rc::new(move |entity: &LightweightPlotEntity<D>| {
                let Some(shared) = weak.upgrade() else {
                    return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
                };
                let waterfall = WaterfallPlot { shared };
                let data = entity.dataset.data();
                let geometry = data.get(entity.index).and_then(|datum| {
                    waterfall
                        .bar_ranges(datum, entity.index, &entity.dataset)
                        .map(|(x_range, y_range)| {
                            EntityGeometry::Rect(Bounds::from_ranges(x_range, y_range))
                        })
                });
                geometry.unwrap_or(EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)))
            })));
    }

    fn bar_top_pixel_point(&self) -> PixelPointFn<D> {
        let weak = Rc::downgrade(&self.shared);
        Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            let waterfall = WaterfallPlot { shared };
            match waterfall.bar_ranges(datum, index, dataset) {
                Some(((low, high), (_, top_px))) => Point::new((low + high) / 2.0, top_px),
                None => Point::new(f64::NAN, f64::NAN),
            }
        })
    }

    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

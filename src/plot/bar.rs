//! Bar plot kind: baseline-anchored rectangles, vertical or horizontal,
//! optionally stacked.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::accessor::{Accessor, AccessorScaleBinding};
use crate::core::dataset::Dataset;
use crate::core::geometry::{Bounds, EntityGeometry, Point};
use crate::core::scale::{ProviderId, Scale};
use crate::core::value::{DomainValue, Extent};
use crate::entity::LightweightPlotEntity;
use crate::plot::plot::{PixelPointFn, Plot};
use crate::plot::xy::XyPlot;
use crate::stacking::{self, StackingOrder, StackingResult};

/// Width in pixels used when the position scale has no band to derive one
/// from.
pub const DEFAULT_BAR_PIXEL_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarOrientation {
    #[default]
    Vertical,
    Horizontal,
}

struct ValueScaleHooks {
    scale: Scale,
    included_provider: ProviderId,
    padding_provider: ProviderId,
}

struct BarShared<D> {
    xy: XyPlot<D>,
    orientation: Cell<BarOrientation>,
    baseline: Cell<f64>,
    fixed_bar_width: Cell<f64>,
    stacking: Cell<Option<StackingOrder>>,
    value_scale_hooks: RefCell<Option<ValueScaleHooks>>,
}

/// Rectangles from a baseline to each datum's value. The position axis may
/// be banded (category) or quantitative; the value axis is quantitative.
pub struct BarPlot<D> {
    shared: Rc<BarShared<D>>,
}

impl<D> Clone for BarPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> BarPlot<D> {
    #[must_use]
    pub fn new(orientation: BarOrientation) -> Self {
        let shared = Rc::new(BarShared {
            xy: XyPlot::new(),
            orientation: Cell::new(orientation),
            baseline: Cell::new(0.0),
            fixed_bar_width: Cell::new(DEFAULT_BAR_PIXEL_WIDTH),
            stacking: Cell::new(None),
            value_scale_hooks: RefCell::new(None),
        });
        let bar = Self { shared };
        bar.install_geometry();
        bar.plot().set_pixel_point(bar.bar_pixel_point());
        let weak = Rc::downgrade(&bar.shared);
        bar.plot().on_destroy(Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                Self::release_value_scale_hooks(&shared);
            }
        }));
        bar
    }

    #[must_use]
    pub fn xy(&self) -> &XyPlot<D> {
        &self.shared.xy
    }

    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        self.shared.xy.plot()
    }

    #[must_use]
    pub fn orientation(&self) -> BarOrientation {
        self.shared.orientation.get()
    }

    // Bindings -------------------------------------------------------------

    pub fn set_x(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_x(accessor, scale);
        self.refresh_value_scale_hooks();
    }

    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.xy.set_y(accessor, scale);
        self.refresh_value_scale_hooks();
    }

    fn position_binding(&self) -> Option<AccessorScaleBinding<D>> {
        match self.shared.orientation.get() {
            BarOrientation::Vertical => self.shared.xy.x(),
            BarOrientation::Horizontal => self.shared.xy.y(),
        }
    }

    fn value_binding(&self) -> Option<AccessorScaleBinding<D>> {
        match self.shared.orientation.get() {
            BarOrientation::Vertical => self.shared.xy.y(),
            BarOrientation::Horizontal => self.shared.xy.x(),
        }
    }

    fn value_property(&self) -> &'static str {
        match self.shared.orientation.get() {
            BarOrientation::Vertical => "y",
            BarOrientation::Horizontal => "x",
        }
    }

    // Baseline -------------------------------------------------------------

    #[must_use]
    pub fn baseline(&self) -> f64 {
        self.shared.baseline.get()
    }

    /// The value every bar grows from. It joins the value scale's domain
    /// (unpadded), so bars always have an anchored end on screen.
    pub fn set_baseline(&self, baseline: f64) {
        self.shared.baseline.set(baseline);
        if let Some(hooks) = &*self.shared.value_scale_hooks.borrow() {
            hooks.scale.auto_domain_if_automatic();
        }
        self.plot().request_render();
    }

    fn release_value_scale_hooks(shared: &BarShared<D>) {
        let hooks = shared.value_scale_hooks.borrow_mut().take();
        if let Some(hooks) = hooks {
            hooks.scale.remove_included_values_provider(hooks.included_provider);
            hooks.scale.remove_padding_exceptions_provider(hooks.padding_provider);
        }
    }

    /// Re-registers the baseline contribution on the current value scale.
    fn refresh_value_scale_hooks(&self) {
        Self::release_value_scale_hooks(&self.shared);
        let Some(scale) = self.value_binding().and_then(|binding| binding.scale) else {
            return;
        };
        if !scale.is_quantitative() {
            return;
        }
        let weak = Rc::downgrade(&self.shared);
        let included_provider = scale.add_included_values_provider(Rc::new(move |_scale| {
            match weak.upgrade() {
                Some(shared) => vec![DomainValue::Number(shared.baseline.get())],
                None => Vec::new(),
            }
        }));
        let weak = Rc::downgrade(&self.shared);
        let padding_provider = scale.add_padding_exceptions_provider(Rc::new(move |_scale| {
            match weak.upgrade() {
                Some(shared) => vec![shared.baseline.get()],
                None => Vec::new(),
            }
        }));
        *self.shared.value_scale_hooks.borrow_mut() = Some(ValueScaleHooks {
            scale,
            included_provider,
            padding_provider,
        });
    }

    // Bar width ------------------------------------------------------------

    /// Pixel width of each bar: the position scale's band when it has one,
    /// the fixed width otherwise.
    #[must_use]
    pub fn bar_pixel_width(&self) -> f64 {
        self.position_binding()
            .and_then(|binding| binding.scale)
            .and_then(|scale| scale.range_band())
            .unwrap_or_else(|| self.shared.fixed_bar_width.get())
    }

    pub fn set_fixed_bar_width(&self, width: f64) {
        self.shared.fixed_bar_width.set(width.max(0.0));
        self.plot().request_render();
    }

    // Stacking -------------------------------------------------------------

    #[must_use]
    pub fn stacking(&self) -> Option<StackingOrder> {
        self.shared.stacking.get()
    }

    /// Enables or disables stacking across datasets. While stacked, the
    /// value property's extents are replaced by the stacked extent (which
    /// always includes zero).
    pub fn set_stacking(&self, order: Option<StackingOrder>) {
        self.shared.stacking.set(order);
        let value_property = self.value_property();
        match order {
            Some(_) => {
                let weak = Rc::downgrade(&self.shared);
                self.plot().set_extent_override(
                    value_property,
                    Some(Rc::new(move || match weak.upgrade() {
                        Some(shared) => BarPlot { shared }.stacked_value_extent(),
                        None => Vec::new(),
                    })),
                );
            }
            None => {
                self.plot().set_extent_override(value_property, None);
            }
        }
        debug!(?order, "bar stacking changed");
        self.plot().update_extents();
        self.plot().request_render();
    }

    /// The cross-dataset stacking result for the current bindings. Empty
    /// when stacking is off or the bindings are incomplete.
    #[must_use]
    pub fn stacking_result(&self) -> StackingResult {
        let Some(order) = self.shared.stacking.get() else {
            return StackingResult::new();
        };
        let (Some(position), Some(value)) = (self.position_binding(), self.value_binding()) else {
            return StackingResult::new();
        };
        stacking::stack(
            &self.plot().datasets(),
            &position.accessor,
            &value.accessor,
            order,
        )
    }

    fn stacked_value_extent(&self) -> Vec<Extent> {
        let Some(position) = self.position_binding() else {
            return Vec::new();
        };
        let result = self.stacking_result();
        let filter = self.plot().property_filter(self.value_property());
        let (min, max) = stacking::stacked_extent(
            &result,
            &self.plot().datasets(),
            &position.accessor,
            filter.as_ref(),
        );
        vec![Extent::Numeric { min, max }]
    }

    /// The stacking offset for one datum, zero when not stacked.
    fn stack_offset(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> f64 {
        if self.shared.stacking.get().is_none() {
            return 0.0;
        }
        let Some(position) = self.position_binding() else {
            return 0.0;
        };
        let key = position.accessor.call(datum, index, dataset).normalized_key();
        self.stacking_result()
            .get(&dataset.id())
            .and_then(|keyed| keyed.get(&key))
            .map(|stacked| stacked.offset)
            .unwrap_or(0.0)
    }

    // Geometry -------------------------------------------------------------

    fn install_geometry(&self) {
        let weak: Weak<BarShared<D>> = Rc::downgrade(&self.shared);
        self.plot()
            .set_entity_geometry(Some(Rc::new(move |entity: &LightweightPlotEntity<D>| {
                let Some(shared) = weak.upgrade() else {
                    return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
                };
                let bar = BarPlot { shared };
                let data = entity.dataset.data();
                match data.get(entity.index) {
                    Some(datum) => bar.bar_geometry(datum, entity.index, &entity.dataset),
                    None => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
                }
            })));
    }

    fn bar_pixel_point(&self) -> PixelPointFn<D> {
        let weak = Rc::downgrade(&self.shared);
        Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            BarPlot { shared }.bar_end_point(datum, index, dataset)
        })
    }

    /// The pixel extent of one bar along the position and value axes, or
    /// `None` when a binding is missing or projects a non-finite value.
    fn bar_ranges(
        &self,
        datum: &D,
        index: usize,
        dataset: &Dataset<D>,
    ) -> Option<((f64, f64), (f64, f64))> {
        let position = self.position_binding()?;
        let value = self.value_binding()?;
        let value_scale = value.scale.clone()?;

        let position_center = position.project_number(datum, index, dataset);
        let raw_value = value.accessor.call(datum, index, dataset).as_number()?;
        let offset = self.stack_offset(datum, index, dataset);
        let (bar_start, bar_end) = if self.shared.stacking.get().is_some() {
            (offset, offset + raw_value)
        } else {
            (self.shared.baseline.get(), raw_value)
        };
        let start_px = value_scale.scale(&DomainValue::Number(bar_start));
        let end_px = value_scale.scale(&DomainValue::Number(bar_end));
        if !position_center.is_finite() || !start_px.is_finite() || !end_px.is_finite() {
            return None;
        }
        let half = self.bar_pixel_width() / 2.0;
        Some((
            (position_center - half, position_center + half),
            (start_px, end_px),
        ))
    }

    fn bar_geometry(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> EntityGeometry {
        match self.bar_ranges(datum, index, dataset) {
            Some((position_range, value_range)) => {
                let bounds = match self.shared.orientation.get() {
                    BarOrientation::Vertical => Bounds::from_ranges(position_range, value_range),
                    BarOrientation::Horizontal => Bounds::from_ranges(value_range, position_range),
                };
                EntityGeometry::Rect(bounds)
            }
            None => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
        }
    }

    /// Entity position: the center of the bar's growing end.
    fn bar_end_point(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> Point {
        match self.bar_ranges(datum, index, dataset) {
            Some(((position_low, position_high), (_, end_px))) => {
                let center = (position_low + position_high) / 2.0;
                match self.shared.orientation.get() {
                    BarOrientation::Vertical => Point::new(center, end_px),
                    BarOrientation::Horizontal => Point::new(end_px, center),
                }
            }
            None => Point::new(f64::NAN, f64::NAN),
        }
    }

    /// Scale hook release runs through the base plot's destroy path, so
    /// destroying via `plot().destroy()` is equivalent.
    pub fn destroy(&self) {
        self.shared.xy.destroy();
    }
}

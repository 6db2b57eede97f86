//! Positional layer over the base plot: `x`/`y` bindings, one-axis
//! autoranging, and deferred rendering for continuous pan/zoom.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::accessor::{Accessor, AccessorScaleBinding, DatumFilter};
use crate::core::dataset::Dataset;
use crate::core::geometry::Point;
use crate::core::scale::Scale;
use crate::core::value::DomainValue;
use crate::plot::plot::{PixelPointFn, Plot};
use crate::render::deferred::DeferredRedrawTask;

/// Which positional domain follows the other's visible window.
///
/// `Y` re-ranges the y scale against only the data whose x value is visible,
/// and symmetrically for `X`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutorangeMode {
    #[default]
    None,
    X,
    Y,
}

/// Cheap visual approximation applied while a full redraw is deferred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredTransform {
    pub magnify_x: f64,
    pub translate_x: f64,
    pub magnify_y: f64,
    pub translate_y: f64,
}

impl Default for DeferredTransform {
    fn default() -> Self {
        Self {
            magnify_x: 1.0,
            translate_x: 0.0,
            magnify_y: 1.0,
            translate_y: 0.0,
        }
    }
}

/// Affine snapshot of a scale's transformation space, probed through the
/// public mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AffineSnapshot {
    m: f64,
    b: f64,
}

impl AffineSnapshot {
    fn of(scale: &Scale) -> Self {
        let b = scale.scale_transformation(0.0);
        let m = scale.scale_transformation(1.0) - b;
        Self { m, b }
    }

    /// The (magnify, translate) pair carrying `self` onto `current`.
    fn approximation_to(self, current: Self) -> (f64, f64) {
        if self.m == 0.0 {
            return (1.0, 0.0);
        }
        let magnify = current.m / self.m;
        let translate = current.b - self.b * magnify;
        (magnify, translate)
    }
}

struct XyShared<D> {
    plot: Plot<D>,
    autorange: Cell<AutorangeMode>,
    deferred_enabled: Cell<bool>,
    deferred_task: RefCell<DeferredRedrawTask>,
    /// Last time the driver reported, used to timestamp scale updates.
    clock_ms: Cell<f64>,
    /// Transformation baselines captured at the last full render.
    baseline_x: Cell<Option<AffineSnapshot>>,
    baseline_y: Cell<Option<AffineSnapshot>>,
}

/// A plot with positional `x`/`y` semantics. Plot kinds wrap this.
pub struct XyPlot<D> {
    shared: Rc<XyShared<D>>,
}

impl<D> Clone for XyPlot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D: 'static> Default for XyPlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> XyPlot<D> {
    #[must_use]
    pub fn new() -> Self {
        let xy = Self {
            shared: Rc::new(XyShared {
                plot: Plot::new(),
                autorange: Cell::new(AutorangeMode::None),
                deferred_enabled: Cell::new(false),
                deferred_task: RefCell::new(DeferredRedrawTask::default()),
                clock_ms: Cell::new(0.0),
                baseline_x: Cell::new(None),
                baseline_y: Cell::new(None),
            }),
        };
        xy.install_scale_update_hook();
        xy.shared.plot.set_pixel_point(xy.positional_pixel_point());
        xy
    }

    /// Pixel projection through the current x/y bindings. Installed as the
    /// plot's pixel point by default; kinds with composite marks reuse it
    /// inside their own geometry.
    #[must_use]
    pub fn positional_pixel_point(&self) -> PixelPointFn<D> {
        let weak = Rc::downgrade(&self.shared);
        Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
            let Some(shared) = weak.upgrade() else {
                return Point::new(f64::NAN, f64::NAN);
            };
            let xy = XyPlot { shared };
            let x = xy
                .x()
                .map(|binding| binding.project_number(datum, index, dataset))
                .unwrap_or(f64::NAN);
            let y = xy
                .y()
                .map(|binding| binding.project_number(datum, index, dataset))
                .unwrap_or(f64::NAN);
            Point::new(x, y)
        })
    }

    /// The underlying plot engine (bindings, datasets, entities, renders).
    #[must_use]
    pub fn plot(&self) -> &Plot<D> {
        &self.shared.plot
    }

    // Positional bindings --------------------------------------------------

    #[must_use]
    pub fn x(&self) -> Option<AccessorScaleBinding<D>> {
        self.shared.plot.property("x")
    }

    pub fn set_x(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.plot.bind_property("x", accessor, scale);
        self.reinstall_autorange();
    }

    #[must_use]
    pub fn y(&self) -> Option<AccessorScaleBinding<D>> {
        self.shared.plot.property("y")
    }

    pub fn set_y(&self, accessor: Accessor<D>, scale: Option<Scale>) {
        self.shared.plot.bind_property("y", accessor, scale);
        self.reinstall_autorange();
    }

    fn x_scale(&self) -> Option<Scale> {
        self.x().and_then(|binding| binding.scale)
    }

    fn y_scale(&self) -> Option<Scale> {
        self.y().and_then(|binding| binding.scale)
    }

    // Autoranging ----------------------------------------------------------

    #[must_use]
    pub fn autorange(&self) -> AutorangeMode {
        self.shared.autorange.get()
    }

    /// Makes one positional scale follow the other's visible window: with
    /// `AutorangeMode::Y`, panning the x scale re-auto-domains y against
    /// only the visible data.
    pub fn set_autorange(&self, mode: AutorangeMode) {
        self.shared.autorange.set(mode);
        self.reinstall_autorange();
        self.shared.plot.update_extents();
    }

    fn reinstall_autorange(&self) {
        let plot = &self.shared.plot;
        plot.set_property_filter("x", None);
        plot.set_property_filter("y", None);
        match self.shared.autorange.get() {
            AutorangeMode::None => {}
            AutorangeMode::X => {
                plot.set_property_filter("x", self.visible_filter(GuideAxis::Y));
            }
            AutorangeMode::Y => {
                plot.set_property_filter("y", self.visible_filter(GuideAxis::X));
            }
        }
    }

    /// A filter keeping data whose position on the guiding axis falls inside
    /// that axis' visible domain.
    fn visible_filter(&self, guide: GuideAxis) -> Option<DatumFilter<D>> {
        let weak = Rc::downgrade(&self.shared);
        Some(Rc::new(
            move |datum: &D, index: usize, dataset: &Dataset<D>| {
                let Some(shared) = weak.upgrade() else {
                    return true;
                };
                let xy = XyPlot { shared };
                let binding = match guide {
                    GuideAxis::X => xy.x(),
                    GuideAxis::Y => xy.y(),
                };
                let Some(binding) = binding else {
                    return true;
                };
                let Some(scale) = &binding.scale else {
                    return true;
                };
                let value = binding.accessor.call(datum, index, dataset);
                domain_contains(scale, &value)
            },
        ))
    }

    // Scale-update handling ------------------------------------------------

    fn install_scale_update_hook(&self) {
        let weak = Rc::downgrade(&self.shared);
        self.shared
            .plot
            .set_scale_update_hook(Some(Rc::new(move |scale: &Scale| {
                if let Some(shared) = weak.upgrade() {
                    XyPlot { shared }.handle_scale_update(scale);
                }
            })));
    }

    fn handle_scale_update(&self, scale: &Scale) {
        let guides_autorange = match self.shared.autorange.get() {
            AutorangeMode::None => false,
            AutorangeMode::X => Some(scale) == self.y_scale().as_ref(),
            AutorangeMode::Y => Some(scale) == self.x_scale().as_ref(),
        };
        if guides_autorange {
            // The guiding window moved, so the adjusted axis' extents are
            // stale. Recomputing also re-auto-domains the adjusted scale.
            self.shared.plot.update_extents();
        }
        if self.shared.deferred_enabled.get() && self.is_positional(scale) {
            trace!("deferring redraw for scale update");
            self.shared
                .deferred_task
                .borrow_mut()
                .schedule(self.shared.clock_ms.get());
        } else {
            self.shared.plot.request_render();
        }
    }

    fn is_positional(&self, scale: &Scale) -> bool {
        Some(scale) == self.x_scale().as_ref() || Some(scale) == self.y_scale().as_ref()
    }

    // Deferred rendering ---------------------------------------------------

    #[must_use]
    pub fn deferred_rendering(&self) -> bool {
        self.shared.deferred_enabled.get()
    }

    /// With deferred rendering on, positional scale updates schedule a
    /// debounced full redraw instead of an immediate one; until it fires,
    /// [`Self::deferred_transform`] approximates the motion.
    pub fn set_deferred_rendering(&self, enabled: bool) {
        self.shared.deferred_enabled.set(enabled);
        if !enabled {
            self.shared.deferred_task.borrow_mut().cancel();
        }
        self.snapshot_baselines();
    }

    /// Advances the driver clock and fires the deferred redraw once the
    /// quiescence window has elapsed. Returns whether a render was requested.
    pub fn tick(&self, now_ms: f64) -> bool {
        self.shared.clock_ms.set(now_ms);
        let fired = self.shared.deferred_task.borrow_mut().poll(now_ms);
        if fired {
            self.shared.plot.request_render();
        }
        fired
    }

    #[must_use]
    pub fn deferred_redraw_pending(&self) -> bool {
        self.shared.deferred_task.borrow().is_pending()
    }

    /// The whole-plot affine approximation between the last full render and
    /// the scales' current transformation spaces.
    #[must_use]
    pub fn deferred_transform(&self) -> DeferredTransform {
        let mut transform = DeferredTransform::default();
        if let (Some(scale), Some(baseline)) = (self.x_scale(), self.shared.baseline_x.get()) {
            (transform.magnify_x, transform.translate_x) =
                baseline.approximation_to(AffineSnapshot::of(&scale));
        }
        if let (Some(scale), Some(baseline)) = (self.y_scale(), self.shared.baseline_y.get()) {
            (transform.magnify_y, transform.translate_y) =
                baseline.approximation_to(AffineSnapshot::of(&scale));
        }
        transform
    }

    fn snapshot_baselines(&self) {
        self.shared
            .baseline_x
            .set(self.x_scale().map(|scale| AffineSnapshot::of(&scale)));
        self.shared
            .baseline_y
            .set(self.y_scale().map(|scale| AffineSnapshot::of(&scale)));
    }

    /// Renders through the base engine and re-baselines the deferred
    /// approximation at the freshly drawn state.
    pub fn render_immediately(&self) -> f64 {
        let time = self.shared.plot.render_immediately();
        self.snapshot_baselines();
        time
    }

    pub fn destroy(&self) {
        self.shared.deferred_task.borrow_mut().cancel();
        self.shared.plot.destroy();
    }
}

#[derive(Debug, Clone, Copy)]
enum GuideAxis {
    X,
    Y,
}

/// Whether `value` falls inside the scale's visible domain window.
fn domain_contains(scale: &Scale, value: &DomainValue) -> bool {
    if scale.is_quantitative() {
        let Some(number) = value.as_number() else {
            return false;
        };
        let (start, end) = scale.transformation_domain();
        let (low, high) = (start.min(end), start.max(end));
        number >= low && number <= high
    } else {
        let key = value.normalized_key();
        scale
            .domain()
            .iter()
            .any(|entry| entry.normalized_key() == key)
    }
}

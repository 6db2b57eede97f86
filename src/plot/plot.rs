//! Base plot engine: dataset membership, attribute/property bindings,
//! extent aggregation, entity queries and the render lifecycle.
//!
//! Plot kinds are built by composition: each kind owns a `Plot` handle and
//! configures the hooks it needs (pixel projection, entity geometry, data
//! filter, extent overrides) instead of overriding protected methods.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::accessor::{Accessor, AccessorScaleBinding, DatumFilter};
use crate::core::dataset::{Dataset, DatasetId};
use crate::core::geometry::{Bounds, EntityGeometry, Point};
use crate::core::observe::SubscriptionId;
use crate::core::scale::{IncludedValuesProvider, ProviderId, Scale, ScaleId};
use crate::core::value::{DomainValue, Extent};
use crate::entity::{EntityStore, LightweightPlotEntity};
use crate::error::{PlotError, PlotResult};
use crate::memoize::{Memoized, Signature};
use crate::render::animator::{Animator, AnimatorKey, EasingAnimator, NullAnimator};
use crate::render::drawer::{
    AttributeToProjector, DrawStep, Drawer, DrawerFactory, SelectionHandle,
};
use crate::render::null_drawer::NullDrawer;

/// Plot lifecycle states. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStatus {
    Unanchored,
    Anchored,
    Destroyed,
}

/// Public-facing entity record, enriched from the lightweight store entry.
#[derive(Debug, Clone)]
pub struct PlotEntity<D> {
    pub datum: D,
    pub dataset: Dataset<D>,
    pub dataset_index: usize,
    pub index: usize,
    pub valid_datum_index: usize,
    pub position: Point,
    pub selection: SelectionHandle,
}

pub type PixelPointFn<D> = Rc<dyn Fn(&D, usize, &Dataset<D>) -> Point>;
pub type GeometryFn<D> = Rc<dyn Fn(&LightweightPlotEntity<D>) -> EntityGeometry>;
type ExtentOverrideFn = Rc<dyn Fn() -> Vec<Extent>>;
type ProjectorHookFn<D> = Rc<dyn Fn() -> AttributeToProjector<D>>;
type ResetHookFn<D> = Rc<dyn Fn(AttributeToProjector<D>) -> AttributeToProjector<D>>;

struct DatasetSlot<D> {
    dataset: Dataset<D>,
    drawer: Box<dyn Drawer<D>>,
    subscription: SubscriptionId,
}

struct ScaleHook {
    scale: Scale,
    subscription: SubscriptionId,
    provider: ProviderId,
    refcount: usize,
}

pub(crate) struct PlotShared<D> {
    status: Cell<PlotStatus>,
    bounds: Cell<Bounds>,
    animate: Cell<bool>,
    data_changed: Cell<bool>,
    render_requested: Cell<bool>,
    render_requests: Cell<u64>,
    bindings_generation: Cell<u64>,
    attr_bindings: RefCell<IndexMap<String, AccessorScaleBinding<D>>>,
    property_bindings: RefCell<IndexMap<String, AccessorScaleBinding<D>>>,
    attr_extents: RefCell<IndexMap<String, Vec<Extent>>>,
    property_extents: RefCell<IndexMap<String, Vec<Extent>>>,
    property_filters: RefCell<IndexMap<String, DatumFilter<D>>>,
    extent_overrides: RefCell<IndexMap<String, ExtentOverrideFn>>,
    datasets: RefCell<IndexMap<DatasetId, DatasetSlot<D>>>,
    scale_hooks: RefCell<IndexMap<ScaleId, ScaleHook>>,
    animators: RefCell<IndexMap<AnimatorKey, Rc<dyn Animator>>>,
    drawer_factory: RefCell<DrawerFactory<D>>,
    pixel_point: RefCell<PixelPointFn<D>>,
    entity_geometry: RefCell<Option<GeometryFn<D>>>,
    data_filter: RefCell<Option<DatumFilter<D>>>,
    property_projectors: RefCell<Option<ProjectorHookFn<D>>>,
    reset_projectors: RefCell<Option<ResetHookFn<D>>>,
    post_paint: RefCell<Option<Rc<dyn Fn(f64)>>>,
    scale_update_hook: RefCell<Option<Rc<dyn Fn(&Scale)>>>,
    destroy_hooks: RefCell<Vec<Rc<dyn Fn()>>>,
    entity_cache: RefCell<Option<Rc<EntityStore<D>>>>,
    entity_builds: Cell<u64>,
    hit_tolerance: Cell<f64>,
    data_to_draw_memo: RefCell<Memoized<Vec<(DatasetId, Vec<usize>)>>>,
}

/// Shared handle to one plot instance. Clones observe the same plot.
pub struct Plot<D> {
    shared: Rc<PlotShared<D>>,
}

impl<D> Clone for Plot<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<D> fmt::Debug for Plot<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plot")
            .field("status", &self.shared.status.get())
            .field("datasets", &self.shared.datasets.borrow().len())
            .finish()
    }
}

impl<D: 'static> Default for Plot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: 'static> Plot<D> {
    #[must_use]
    pub fn new() -> Self {
        let mut animators: IndexMap<AnimatorKey, Rc<dyn Animator>> = IndexMap::new();
        animators.insert(AnimatorKey::Main, Rc::new(EasingAnimator::default()));
        animators.insert(AnimatorKey::Reset, Rc::new(NullAnimator));
        let plot = Self {
            shared: Rc::new(PlotShared {
                status: Cell::new(PlotStatus::Unanchored),
                bounds: Cell::new(Bounds::from_ranges((0.0, 0.0), (0.0, 0.0))),
                animate: Cell::new(false),
                data_changed: Cell::new(false),
                render_requested: Cell::new(false),
                render_requests: Cell::new(0),
                bindings_generation: Cell::new(0),
                attr_bindings: RefCell::new(IndexMap::new()),
                property_bindings: RefCell::new(IndexMap::new()),
                attr_extents: RefCell::new(IndexMap::new()),
                property_extents: RefCell::new(IndexMap::new()),
                property_filters: RefCell::new(IndexMap::new()),
                extent_overrides: RefCell::new(IndexMap::new()),
                datasets: RefCell::new(IndexMap::new()),
                scale_hooks: RefCell::new(IndexMap::new()),
                animators: RefCell::new(animators),
                drawer_factory: RefCell::new(Rc::new(|_dataset: &Dataset<D>| {
                    Box::new(NullDrawer::new()) as Box<dyn Drawer<D>>
                })),
                pixel_point: RefCell::new(Rc::new(|_, _, _| Point::new(0.0, 0.0))),
                entity_geometry: RefCell::new(None),
                data_filter: RefCell::new(None),
                property_projectors: RefCell::new(None),
                reset_projectors: RefCell::new(None),
                post_paint: RefCell::new(None),
                scale_update_hook: RefCell::new(None),
                destroy_hooks: RefCell::new(Vec::new()),
                entity_cache: RefCell::new(None),
                entity_builds: Cell::new(0),
                hit_tolerance: Cell::new(0.0),
                data_to_draw_memo: RefCell::new(Memoized::new()),
            }),
        };
        plot
    }

    fn from_shared(shared: Rc<PlotShared<D>>) -> Self {
        Self { shared }
    }

    fn downgrade(&self) -> Weak<PlotShared<D>> {
        Rc::downgrade(&self.shared)
    }

    // Lifecycle ------------------------------------------------------------

    #[must_use]
    pub fn status(&self) -> PlotStatus {
        self.shared.status.get()
    }

    /// Attaches the plot to a drawing surface region and performs the first
    /// full extent pass. Destroyed plots cannot be reused.
    pub fn anchor(&self, bounds: Bounds) -> PlotResult<()> {
        if self.shared.status.get() == PlotStatus::Destroyed {
            return Err(PlotError::Destroyed);
        }
        self.shared.bounds.set(bounds);
        self.shared.status.set(PlotStatus::Anchored);
        self.shared.data_changed.set(true);
        self.invalidate_entity_cache();
        self.update_extents();
        Ok(())
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.shared.bounds.get()
    }

    /// Releases every scale and dataset subscription. Idempotent.
    pub fn destroy(&self) {
        if self.shared.status.get() == PlotStatus::Destroyed {
            return;
        }
        self.shared.status.set(PlotStatus::Destroyed);
        let hooks: Vec<ScaleHook> = self.shared.scale_hooks.borrow_mut().drain(..).map(|(_, hook)| hook).collect();
        for hook in hooks {
            hook.scale.off_update(hook.subscription);
            hook.scale.remove_included_values_provider(hook.provider);
        }
        let slots: Vec<DatasetSlot<D>> = self.shared.datasets.borrow_mut().drain(..).map(|(_, slot)| slot).collect();
        for mut slot in slots {
            slot.dataset.off_update(slot.subscription);
            slot.drawer.remove();
        }
        let hooks: Vec<Rc<dyn Fn()>> = self.shared.destroy_hooks.borrow_mut().drain(..).collect();
        for hook in hooks {
            hook();
        }
        self.invalidate_entity_cache();
        debug!("plot destroyed");
    }

    /// Registers cleanup to run once when the plot is destroyed. Kinds use
    /// this to release hooks they installed on collaborating scales.
    pub fn on_destroy(&self, hook: Rc<dyn Fn()>) {
        self.shared.destroy_hooks.borrow_mut().push(hook);
    }

    // Animation ------------------------------------------------------------

    #[must_use]
    pub fn animated(&self) -> bool {
        self.shared.animate.get()
    }

    pub fn set_animated(&self, animate: bool) {
        self.shared.animate.set(animate);
    }

    #[must_use]
    pub fn animator(&self, key: AnimatorKey) -> Option<Rc<dyn Animator>> {
        self.shared.animators.borrow().get(&key).map(Rc::clone)
    }

    pub fn set_animator(&self, key: AnimatorKey, animator: Rc<dyn Animator>) {
        self.shared.animators.borrow_mut().insert(key, animator);
    }

    /// A plot animates only when animation is enabled and the data actually
    /// changed since the last completed render.
    #[must_use]
    pub fn animate_on_next_render(&self) -> bool {
        self.shared.animate.get() && self.shared.data_changed.get()
    }

    // Dataset membership ---------------------------------------------------

    pub fn add_dataset(&self, dataset: Dataset<D>) {
        self.attach_dataset(dataset);
        self.on_dataset_update();
    }

    fn attach_dataset(&self, dataset: Dataset<D>) {
        self.detach_dataset(&dataset);
        let drawer = (self.shared.drawer_factory.borrow())(&dataset);
        let weak = self.downgrade();
        let subscription = dataset.on_update(move |_dataset| {
            if let Some(shared) = weak.upgrade() {
                Plot::from_shared(shared).on_dataset_update();
            }
        });
        self.shared.datasets.borrow_mut().insert(
            dataset.id(),
            DatasetSlot {
                dataset,
                drawer,
                subscription,
            },
        );
    }

    /// Removing a dataset not currently present is a no-op.
    pub fn remove_dataset(&self, dataset: &Dataset<D>) {
        if self.detach_dataset(dataset) {
            self.on_dataset_update();
        }
    }

    fn detach_dataset(&self, dataset: &Dataset<D>) -> bool {
        let slot = self.shared.datasets.borrow_mut().shift_remove(&dataset.id());
        match slot {
            Some(mut slot) => {
                slot.dataset.off_update(slot.subscription);
                slot.drawer.remove();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn datasets(&self) -> Vec<Dataset<D>> {
        self.shared
            .datasets
            .borrow()
            .values()
            .map(|slot| slot.dataset.clone())
            .collect()
    }

    /// Replaces the entire dataset list.
    pub fn set_datasets(&self, datasets: Vec<Dataset<D>>) {
        let current = self.datasets();
        for dataset in &current {
            self.detach_dataset(dataset);
        }
        for dataset in datasets {
            self.attach_dataset(dataset);
        }
        self.on_dataset_update();
    }

    /// Update cascade shared by membership changes and content mutation.
    fn on_dataset_update(&self) {
        if self.shared.status.get() == PlotStatus::Destroyed {
            return;
        }
        trace!("plot dataset update");
        self.shared.data_changed.set(true);
        self.invalidate_entity_cache();
        self.update_extents();
        self.request_render();
    }

    // Bindings -------------------------------------------------------------

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<AccessorScaleBinding<D>> {
        self.shared.attr_bindings.borrow().get(name).cloned()
    }

    /// Binds a visual attribute to an accessor, optionally scaled.
    /// Rebinding atomically swaps the scale hooks for this attribute.
    pub fn set_attr(&self, name: &str, accessor: Accessor<D>, scale: Option<Scale>) {
        self.bind(name, accessor, scale, BindingKind::Attr);
        self.request_render();
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<AccessorScaleBinding<D>> {
        self.shared.property_bindings.borrow().get(name).cloned()
    }

    /// Binds a positional property (`x`, `y`, `x2`, `sector_value`, ...).
    /// Kinds re-trigger dependent recomputation on top of this.
    pub fn bind_property(&self, name: &str, accessor: Accessor<D>, scale: Option<Scale>) {
        self.bind(name, accessor, scale, BindingKind::Property);
        self.invalidate_entity_cache();
        self.request_render();
    }

    fn bind(&self, name: &str, accessor: Accessor<D>, scale: Option<Scale>, kind: BindingKind) {
        let bindings = match kind {
            BindingKind::Attr => &self.shared.attr_bindings,
            BindingKind::Property => &self.shared.property_bindings,
        };
        let old_scale = {
            let mut bindings = bindings.borrow_mut();
            let binding = AccessorScaleBinding::new(accessor, scale.clone());
            bindings
                .insert(name.to_owned(), binding)
                .and_then(|old| old.scale)
        };
        self.bump_bindings_generation();
        self.update_extents_for_key(name, kind);

        // Uninstall before install so a shared scale never double-registers.
        if let Some(old_scale) = old_scale {
            self.uninstall_scale(&old_scale);
        }
        if let Some(new_scale) = scale {
            self.install_scale(&new_scale);
            new_scale.auto_domain_if_automatic();
        }
    }

    /// Invalidates the data-to-draw memo: its signature folds this counter
    /// in, so any configuration change that affects drawability must bump it.
    fn bump_bindings_generation(&self) {
        self.shared
            .bindings_generation
            .set(self.shared.bindings_generation.get() + 1);
    }

    fn install_scale(&self, scale: &Scale) {
        let mut hooks = self.shared.scale_hooks.borrow_mut();
        if let Some(hook) = hooks.get_mut(&scale.id()) {
            hook.refcount += 1;
            return;
        }
        let weak = self.downgrade();
        let subscription = scale.on_update(move |scale| {
            if let Some(shared) = weak.upgrade() {
                Plot::from_shared(shared).handle_scale_update(scale);
            }
        });
        let weak = self.downgrade();
        let provider: IncludedValuesProvider = Rc::new(move |scale: &Scale| {
            weak.upgrade()
                .map(|shared| Plot::from_shared(shared).included_values_for_scale(scale))
                .unwrap_or_default()
        });
        let provider_id = scale.add_included_values_provider(provider);
        hooks.insert(
            scale.id(),
            ScaleHook {
                scale: scale.clone(),
                subscription,
                provider: provider_id,
                refcount: 1,
            },
        );
    }

    fn uninstall_scale(&self, scale: &Scale) {
        let mut hooks = self.shared.scale_hooks.borrow_mut();
        let Some(hook) = hooks.get_mut(&scale.id()) else {
            return;
        };
        hook.refcount -= 1;
        if hook.refcount > 0 {
            return;
        }
        let Some(hook) = hooks.shift_remove(&scale.id()) else {
            return;
        };
        drop(hooks);
        hook.scale.off_update(hook.subscription);
        hook.scale.remove_included_values_provider(hook.provider);
    }

    fn handle_scale_update(&self, scale: &Scale) {
        if self.shared.status.get() == PlotStatus::Destroyed {
            return;
        }
        let hook = self.shared.scale_update_hook.borrow().clone();
        match hook {
            Some(hook) => hook(scale),
            None => self.request_render(),
        }
    }

    /// Replaces the default scale-update reaction (request render). Used by
    /// the XY layer for deferred rendering and autoranging.
    pub fn set_scale_update_hook(&self, hook: Option<Rc<dyn Fn(&Scale)>>) {
        *self.shared.scale_update_hook.borrow_mut() = hook;
    }

    // Extent aggregation ---------------------------------------------------

    /// Recomputes the extents of every bound attribute and property, then
    /// lets each bound scale re-auto-domain against them.
    pub fn update_extents(&self) {
        let attr_keys: Vec<String> = self.shared.attr_bindings.borrow().keys().cloned().collect();
        for key in attr_keys {
            self.update_extents_for_key(&key, BindingKind::Attr);
        }
        let property_keys: Vec<String> = self
            .shared
            .property_bindings
            .borrow()
            .keys()
            .cloned()
            .collect();
        for key in property_keys {
            self.update_extents_for_key(&key, BindingKind::Property);
        }
        let scales: Vec<Scale> = self
            .shared
            .scale_hooks
            .borrow()
            .values()
            .map(|hook| hook.scale.clone())
            .collect();
        for scale in scales {
            scale.auto_domain_if_automatic();
        }
    }

    fn update_extents_for_key(&self, key: &str, kind: BindingKind) {
        let (bindings, extents) = match kind {
            BindingKind::Attr => (&self.shared.attr_bindings, &self.shared.attr_extents),
            BindingKind::Property => (&self.shared.property_bindings, &self.shared.property_extents),
        };
        let binding = bindings.borrow().get(key).cloned();
        let Some(binding) = binding else {
            extents.borrow_mut().shift_remove(key);
            return;
        };
        // Attributes are never filtered; properties may be (autorange).
        let filter = match kind {
            BindingKind::Attr => None,
            BindingKind::Property => self.shared.property_filters.borrow().get(key).cloned(),
        };
        let datasets = self.datasets();
        let computed: Vec<Extent> = datasets
            .iter()
            .map(|dataset| Self::compute_extent(dataset, &binding, filter.as_ref()))
            .collect();
        extents.borrow_mut().insert(key.to_owned(), computed);
    }

    fn compute_extent(
        dataset: &Dataset<D>,
        binding: &AccessorScaleBinding<D>,
        filter: Option<&DatumFilter<D>>,
    ) -> Extent {
        let Some(scale) = &binding.scale else {
            return Extent::Empty;
        };
        let data = dataset.data();
        let mut values: Vec<DomainValue> = Vec::with_capacity(data.len());
        for (index, datum) in data.iter().enumerate() {
            if let Some(filter) = filter {
                if !filter(datum, index, dataset) {
                    continue;
                }
            }
            values.push(binding.accessor.call(datum, index, dataset));
        }
        scale.extent_of_values(&values)
    }

    /// All extents currently bound to `scale`, flattened into domain values.
    /// Invoked by the scale's auto-domain pass through the registered
    /// included-values provider.
    #[must_use]
    pub fn included_values_for_scale(&self, scale: &Scale) -> Vec<DomainValue> {
        if self.shared.status.get() != PlotStatus::Anchored {
            return Vec::new();
        }
        let mut values = Vec::new();
        {
            let bindings = self.shared.attr_bindings.borrow();
            let extents = self.shared.attr_extents.borrow();
            for (name, binding) in bindings.iter() {
                if binding.scale.as_ref() == Some(scale) {
                    if let Some(extent_list) = extents.get(name) {
                        for extent in extent_list {
                            values.extend(extent.values());
                        }
                    }
                }
            }
        }
        let property_names: Vec<String> = {
            let bindings = self.shared.property_bindings.borrow();
            bindings
                .iter()
                .filter(|(_, binding)| binding.scale.as_ref() == Some(scale))
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in property_names {
            for extent in self.extents_for_property(&name) {
                values.extend(extent.values());
            }
        }
        values
    }

    /// Per-dataset extents for a property, with any kind-installed override
    /// (e.g. stacked extent) applied.
    #[must_use]
    pub fn extents_for_property(&self, name: &str) -> Vec<Extent> {
        let overridden = self.shared.extent_overrides.borrow().get(name).cloned();
        if let Some(overridden) = overridden {
            return overridden();
        }
        self.shared
            .property_extents
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Restricts which data contribute to a property's extent.
    pub fn set_property_filter(&self, name: &str, filter: Option<DatumFilter<D>>) {
        let mut filters = self.shared.property_filters.borrow_mut();
        match filter {
            Some(filter) => {
                filters.insert(name.to_owned(), filter);
            }
            None => {
                filters.shift_remove(name);
            }
        }
    }

    /// The filter installed for a property, if any. Kind-installed extent
    /// overrides consult this so synthetic extents honor the same
    /// restriction as the raw ones.
    #[must_use]
    pub fn property_filter(&self, name: &str) -> Option<DatumFilter<D>> {
        self.shared.property_filters.borrow().get(name).cloned()
    }

    /// Replaces a property's raw extents with synthetic ones (stacking).
    pub fn set_extent_override(&self, name: &str, hook: Option<Rc<dyn Fn() -> Vec<Extent>>>) {
        let mut overrides = self.shared.extent_overrides.borrow_mut();
        match hook {
            Some(hook) => {
                overrides.insert(name.to_owned(), hook);
            }
            None => {
                overrides.shift_remove(name);
            }
        }
    }

    // Kind configuration ---------------------------------------------------

    pub fn set_drawer_factory(&self, factory: DrawerFactory<D>) {
        *self.shared.drawer_factory.borrow_mut() = factory;
    }

    pub fn set_pixel_point(&self, pixel_point: PixelPointFn<D>) {
        *self.shared.pixel_point.borrow_mut() = pixel_point;
        self.bump_bindings_generation();
        self.invalidate_entity_cache();
    }

    #[must_use]
    pub fn pixel_point(&self, datum: &D, index: usize, dataset: &Dataset<D>) -> Point {
        (self.shared.pixel_point.borrow())(datum, index, dataset)
    }

    /// Installs the pixel-space footprint used for hit-testing. Kinds with
    /// non-point marks (bars, segments) install rect/segment geometry here.
    pub fn set_entity_geometry(&self, geometry: Option<GeometryFn<D>>) {
        *self.shared.entity_geometry.borrow_mut() = geometry;
        self.invalidate_entity_cache();
    }

    /// Tolerance in pixels for `entities_at` on point/segment geometry.
    pub fn set_hit_tolerance(&self, tolerance: f64) {
        self.shared.hit_tolerance.set(tolerance.max(0.0));
    }

    /// Restricts which data are drawn (beyond the finite-position rule).
    pub fn set_data_filter(&self, filter: Option<DatumFilter<D>>) {
        *self.shared.data_filter.borrow_mut() = filter;
        self.bump_bindings_generation();
    }

    /// Supplies kind-computed projectors (positions, sizes) merged under the
    /// user's attribute projectors.
    pub fn set_property_projectors(&self, hook: Option<ProjectorHookFn<D>>) {
        *self.shared.property_projectors.borrow_mut() = hook;
    }

    /// Transforms the main projector table into the "reset" table used for
    /// the animation entry step.
    pub fn set_reset_projectors(&self, hook: Option<ResetHookFn<D>>) {
        *self.shared.reset_projectors.borrow_mut() = hook;
    }

    /// Hook invoked after the longest drawer animation of a paint.
    pub fn set_post_paint(&self, hook: Option<Rc<dyn Fn(f64)>>) {
        *self.shared.post_paint.borrow_mut() = hook;
    }

    // Rendering ------------------------------------------------------------

    /// Requests a render. The embedding driver coalesces requests and pumps
    /// [`Self::render_immediately`] at a draw boundary.
    pub fn request_render(&self) {
        self.shared.render_requested.set(true);
        self.shared
            .render_requests
            .set(self.shared.render_requests.get() + 1);
    }

    /// Clears and returns the pending render request.
    pub fn take_render_request(&self) -> bool {
        let requested = self.shared.render_requested.get();
        self.shared.render_requested.set(false);
        requested
    }

    #[must_use]
    pub fn render_request_count(&self) -> u64 {
        self.shared.render_requests.get()
    }

    /// Generates draw steps, hands them to each dataset's drawer, and fires
    /// the post-paint hook after the longest draw time. Returns that time.
    ///
    /// Idempotent with respect to visual output: a second call with no
    /// intervening state change replays the same projector outputs.
    pub fn render_immediately(&self) -> f64 {
        if self.shared.status.get() != PlotStatus::Anchored {
            return 0.0;
        }
        let steps = self.generate_draw_steps();
        let data_to_draw = self.data_to_draw();

        let mut max_time: f64 = 0.0;
        {
            let mut slots = self.shared.datasets.borrow_mut();
            for (dataset_id, indices) in &data_to_draw {
                let Some(slot) = slots.get_mut(dataset_id) else {
                    continue;
                };
                let DatasetSlot {
                    dataset, drawer, ..
                } = slot;
                drawer.draw(dataset, indices, &steps);
                max_time = max_time.max(drawer.total_draw_time(indices, &steps));
            }
        }
        let post_paint = self.shared.post_paint.borrow().clone();
        if let Some(post_paint) = post_paint {
            post_paint(max_time);
        }
        self.shared.data_changed.set(false);
        self.shared.render_requested.set(false);
        max_time
    }

    /// The projector table for every bound attribute, merged over the
    /// kind-supplied property projectors (user attrs win on conflict).
    #[must_use]
    pub fn generate_attr_to_projector(&self) -> AttributeToProjector<D> {
        let mut table: AttributeToProjector<D> = IndexMap::new();
        for (name, binding) in self.shared.attr_bindings.borrow().iter() {
            let binding = binding.clone();
            table.insert(
                name.clone(),
                Rc::new(move |datum: &D, index: usize, dataset: &Dataset<D>| {
                    binding.project(datum, index, dataset)
                }),
            );
        }
        let hook = self.shared.property_projectors.borrow().clone();
        if let Some(hook) = hook {
            for (name, projector) in hook() {
                table.entry(name).or_insert(projector);
            }
        }
        table
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep<D>> {
        let main_table = self.generate_attr_to_projector();
        let mut steps: SmallVec<[DrawStep<D>; 2]> = SmallVec::new();
        if self.animate_on_next_render() {
            let reset_hook = self.shared.reset_projectors.borrow().clone();
            if let Some(reset_hook) = reset_hook {
                steps.push(DrawStep {
                    attr_to_projector: reset_hook(main_table.clone()),
                    animator: self.animator_or_null(AnimatorKey::Reset),
                });
            }
            steps.push(DrawStep {
                attr_to_projector: main_table,
                animator: self.animator_or_null(AnimatorKey::Main),
            });
        } else {
            steps.push(DrawStep {
                attr_to_projector: main_table,
                animator: Rc::new(NullAnimator),
            });
        }
        steps.into_vec()
    }

    fn animator_or_null(&self, key: AnimatorKey) -> Rc<dyn Animator> {
        self.animator(key).unwrap_or_else(|| Rc::new(NullAnimator))
    }

    /// Per-dataset indices of drawable data: finite pixel position, passing
    /// the kind's data filter. Memoized on dataset revisions, bound scale
    /// revisions and the binding generation.
    #[must_use]
    pub fn data_to_draw(&self) -> Vec<(DatasetId, Vec<usize>)> {
        let datasets = self.datasets();
        let scales: Vec<Scale> = self
            .shared
            .scale_hooks
            .borrow()
            .values()
            .map(|hook| hook.scale.clone())
            .collect();
        let signature = Signature::list(
            datasets
                .iter()
                .map(Signature::dataset)
                .chain(scales.iter().map(Signature::scale))
                .chain(std::iter::once(Signature::Reference(
                    self.shared.bindings_generation.get(),
                ))),
        );
        let pixel_point = self.shared.pixel_point.borrow().clone();
        let filter = self.shared.data_filter.borrow().clone();
        let mut memo = self.shared.data_to_draw_memo.borrow_mut();
        memo.get(signature, || {
            datasets
                .iter()
                .map(|dataset| {
                    let data = dataset.data();
                    let indices = data
                        .iter()
                        .enumerate()
                        .filter(|(index, datum)| {
                            if let Some(filter) = &filter {
                                if !filter(datum, *index, dataset) {
                                    return false;
                                }
                            }
                            pixel_point(datum, *index, dataset).is_finite()
                        })
                        .map(|(index, _)| index)
                        .collect();
                    (dataset.id(), indices)
                })
                .collect()
        })
        .clone()
    }

    // Entities -------------------------------------------------------------

    fn invalidate_entity_cache(&self) {
        *self.shared.entity_cache.borrow_mut() = None;
    }

    /// Number of entity-store rebuilds performed so far (cache spy).
    #[must_use]
    pub fn entity_build_count(&self) -> u64 {
        self.shared.entity_builds.get()
    }

    fn geometry_resolver(&self) -> Rc<dyn Fn(&LightweightPlotEntity<D>) -> EntityGeometry> {
        let weak = self.downgrade();
        Rc::new(move |entity: &LightweightPlotEntity<D>| {
            let Some(shared) = weak.upgrade() else {
                return EntityGeometry::Point(Point::new(f64::NAN, f64::NAN));
            };
            let plot = Plot::from_shared(shared);
            let geometry = plot.shared.entity_geometry.borrow().clone();
            match geometry {
                Some(geometry) => geometry(entity),
                None => {
                    let data = entity.dataset.data();
                    match data.get(entity.index) {
                        Some(datum) => EntityGeometry::Point(plot.pixel_point(
                            datum,
                            entity.index,
                            &entity.dataset,
                        )),
                        None => EntityGeometry::Point(Point::new(f64::NAN, f64::NAN)),
                    }
                }
            }
        })
    }

    /// The cached entity store, rebuilt lazily after any invalidation.
    #[must_use]
    pub fn entity_store(&self) -> Rc<EntityStore<D>> {
        if let Some(store) = &*self.shared.entity_cache.borrow() {
            return Rc::clone(store);
        }
        let store = Rc::new(EntityStore::build(
            &self.datasets(),
            self.geometry_resolver(),
        ));
        self.shared
            .entity_builds
            .set(self.shared.entity_builds.get() + 1);
        *self.shared.entity_cache.borrow_mut() = Some(Rc::clone(&store));
        store
    }

    fn entity_store_for(&self, datasets: Option<&[Dataset<D>]>) -> Rc<EntityStore<D>> {
        match datasets {
            // A dataset-filtered store is built fresh and not cached.
            Some(datasets) => {
                let owned: Vec<Dataset<D>> = self
                    .datasets()
                    .into_iter()
                    .filter(|dataset| datasets.contains(dataset))
                    .collect();
                Rc::new(EntityStore::build(&owned, self.geometry_resolver()))
            }
            None => self.entity_store(),
        }
    }
}

impl<D: Clone + 'static> Plot<D> {
    fn to_plot_entity(
        &self,
        store: &EntityStore<D>,
        entity: &LightweightPlotEntity<D>,
    ) -> PlotEntity<D> {
        let datum = entity.dataset.data()[entity.index].clone();
        let selection = {
            let slots = self.shared.datasets.borrow();
            slots
                .get(&entity.dataset.id())
                .map(|slot| slot.drawer.selection_for_index(entity.valid_datum_index))
                .unwrap_or(SelectionHandle {
                    drawer_id: u64::MAX,
                    index: entity.valid_datum_index,
                })
        };
        PlotEntity {
            datum,
            dataset: entity.dataset.clone(),
            dataset_index: entity.dataset_index,
            index: entity.index,
            valid_datum_index: entity.valid_datum_index,
            position: store.position(entity),
            selection,
        }
    }

    /// All entities, optionally restricted to the given datasets.
    #[must_use]
    pub fn entities(&self, datasets: Option<&[Dataset<D>]>) -> Vec<PlotEntity<D>> {
        let store = self.entity_store_for(datasets);
        store
            .entities()
            .iter()
            .map(|entity| self.to_plot_entity(&store, entity))
            .collect()
    }

    /// The entity nearest the query point among those visible within
    /// `bounds` (defaults to the plot bounds).
    #[must_use]
    pub fn entity_nearest(&self, query_point: Point, bounds: Option<Bounds>) -> Option<PlotEntity<D>> {
        let bounds = bounds.unwrap_or_else(|| self.bounds());
        let store = self.entity_store();
        let nearest = store
            .entity_nearest(query_point, |_, geometry| bounds.contains(geometry.position()))
            .cloned();
        nearest.map(|entity| self.to_plot_entity(&store, &entity))
    }

    /// Entities whose geometry contains the query point, under the kind's
    /// containment rule and tolerance.
    #[must_use]
    pub fn entities_at(&self, point: Point) -> Vec<PlotEntity<D>> {
        let store = self.entity_store();
        let hits: Vec<LightweightPlotEntity<D>> = store
            .entities_at(point, self.shared.hit_tolerance.get())
            .into_iter()
            .cloned()
            .collect();
        hits.iter()
            .map(|entity| self.to_plot_entity(&store, entity))
            .collect()
    }

    /// Entities whose geometry intersects the query region.
    #[must_use]
    pub fn entities_in(&self, bounds: Bounds) -> Vec<PlotEntity<D>> {
        let store = self.entity_store();
        let hits: Vec<LightweightPlotEntity<D>> = store
            .entities_in(bounds)
            .into_iter()
            .cloned()
            .collect();
        hits.iter()
            .map(|entity| self.to_plot_entity(&store, entity))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Attr,
    Property,
}

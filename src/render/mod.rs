pub mod animator;
pub mod deferred;
pub mod drawer;
pub mod null_drawer;

pub use animator::{Animator, AnimatorKey, EasingAnimator, NullAnimator};
pub use deferred::{DEFAULT_QUIESCENCE_MS, DeferredRedrawTask};
pub use drawer::{AttributeToProjector, DrawStep, Drawer, DrawerFactory, Projector, SelectionHandle};
pub use null_drawer::{NullDrawer, NullDrawerRegistry};

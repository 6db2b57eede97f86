pub mod accessor;
pub mod category_scale;
pub mod dataset;
pub mod geometry;
pub mod linear_scale;
pub mod observe;
pub mod scale;
pub mod value;

pub use accessor::{Accessor, AccessorScaleBinding, DatumFilter};
pub use dataset::{Dataset, DatasetId};
pub use geometry::{Bounds, EntityGeometry, Point};
pub use observe::{CallbackSet, SubscriptionId};
pub use scale::{IncludedValuesProvider, PaddingExceptionsProvider, ProviderId, Scale, ScaleId};
pub use value::{DomainValue, Extent};

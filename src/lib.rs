//! plotive: declarative plotting engine core.
//!
//! This crate provides the data-to-visual binding layer of a plotting
//! library: datasets with change notification, scales with automatic
//! domain aggregation, accessor/scale bindings, cross-dataset stacking,
//! entity hit-testing and a render lifecycle, all backend-agnostic.
//! Drawing is delegated to pluggable [`render::Drawer`] implementations.

pub mod core;
pub mod entity;
pub mod error;
pub mod memoize;
pub mod plot;
pub mod render;
pub mod stacking;
pub mod telemetry;

pub use crate::core::{
    Accessor, AccessorScaleBinding, Bounds, Dataset, DatumFilter, DomainValue, EntityGeometry,
    Extent, Point, Scale,
};
pub use error::{PlotError, PlotResult};
pub use plot::{
    AreaPlot, AutorangeMode, BarOrientation, BarPlot, LinePlot, PiePlot, Plot, PlotEntity,
    PlotStatus, RectanglePlot, ScatterPlot, SegmentPlot, WaterfallPlot, XyPlot,
};
pub use stacking::{StackedDatum, StackingOrder, StackingResult};

pub mod area;
pub mod bar;
pub mod line;
pub mod pie;
#[allow(clippy::module_inception)]
pub mod plot;
pub mod rectangle;
pub mod scatter;
pub mod segment;
pub mod waterfall;
pub mod xy;

pub use area::AreaPlot;
pub use bar::{BarOrientation, BarPlot, DEFAULT_BAR_PIXEL_WIDTH};
pub use line::{DEFAULT_LINE_HIT_TOLERANCE, LinePlot};
pub use pie::{PiePlot, SectorAngles};
pub use plot::{GeometryFn, PixelPointFn, Plot, PlotEntity, PlotStatus};
pub use rectangle::RectanglePlot;
pub use scatter::{DEFAULT_SYMBOL_SIZE, ScatterPlot};
pub use segment::{DEFAULT_SEGMENT_HIT_TOLERANCE, SegmentPlot};
pub use waterfall::WaterfallPlot;
pub use xy::{AutorangeMode, DeferredTransform, XyPlot};

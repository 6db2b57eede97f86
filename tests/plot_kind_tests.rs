use std::f64::consts::TAU;

use approx::assert_relative_eq;
use plotive::core::{Accessor, Bounds, Dataset, DomainValue, EntityGeometry, Point, Scale};
use plotive::plot::{
    BarOrientation, BarPlot, PiePlot, RectanglePlot, ScatterPlot, WaterfallPlot,
};

fn identity_scale() -> Scale {
    let scale = Scale::linear();
    scale
        .set_domain(&[DomainValue::number(0.0), DomainValue::number(100.0)])
        .expect("set domain");
    scale.set_range((0.0, 100.0));
    scale
}

// Scatter ------------------------------------------------------------------

#[test]
fn scatter_hit_tests_against_the_symbol_bounding_box() {
    let scatter = ScatterPlot::new();
    scatter.set_x(Accessor::number(|p: &(f64, f64)| p.0), Some(identity_scale()));
    scatter.set_y(Accessor::number(|p: &(f64, f64)| p.1), Some(identity_scale()));
    scatter.set_size(Accessor::constant(10.0), None);
    scatter.plot().add_dataset(Dataset::new(vec![(50.0, 50.0)]));
    scatter
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // Inside the 10px square around (50, 50).
    assert_eq!(scatter.plot().entities_at(Point::new(54.0, 46.0)).len(), 1);
    // Just outside it.
    assert!(scatter.plot().entities_at(Point::new(56.0, 50.0)).is_empty());
}

// Bar ----------------------------------------------------------------------

#[test]
fn vertical_bar_geometry_spans_baseline_to_value() {
    let bar = BarPlot::new(BarOrientation::Vertical);
    bar.set_x(Accessor::number(|p: &(f64, f64)| p.0), Some(identity_scale()));
    bar.set_y(Accessor::number(|p: &(f64, f64)| p.1), Some(identity_scale()));
    bar.set_fixed_bar_width(8.0);
    bar.plot().add_dataset(Dataset::new(vec![(50.0, 30.0)]));
    bar.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // Inside the bar: between the baseline (0) and the value (30).
    assert_eq!(bar.plot().entities_at(Point::new(50.0, 15.0)).len(), 1);
    assert_eq!(bar.plot().entities_at(Point::new(53.9, 29.0)).len(), 1);
    // Outside horizontally (half-width is 4px) and above the value.
    assert!(bar.plot().entities_at(Point::new(55.0, 15.0)).is_empty());
    assert!(bar.plot().entities_at(Point::new(50.0, 31.0)).is_empty());
}

#[test]
fn horizontal_bar_swaps_position_and_value_axes() {
    let bar = BarPlot::new(BarOrientation::Horizontal);
    bar.set_x(Accessor::number(|p: &(f64, f64)| p.0), Some(identity_scale()));
    bar.set_y(Accessor::number(|p: &(f64, f64)| p.1), Some(identity_scale()));
    bar.set_fixed_bar_width(8.0);
    bar.plot().add_dataset(Dataset::new(vec![(40.0, 60.0)]));
    bar.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // The bar runs along x from 0 to the value (40) at y near 60.
    assert_eq!(bar.plot().entities_at(Point::new(20.0, 60.0)).len(), 1);
    assert!(bar.plot().entities_at(Point::new(45.0, 60.0)).is_empty());
}

#[test]
fn bar_baseline_joins_the_value_domain_unpadded() {
    let y = Scale::linear();
    let bar = BarPlot::new(BarOrientation::Vertical);
    bar.set_x(Accessor::number(|p: &(f64, f64)| p.0), Some(Scale::linear()));
    bar.set_y(Accessor::number(|p: &(f64, f64)| p.1), Some(y.clone()));
    bar.plot()
        .add_dataset(Dataset::new(vec![(0.0, 5.0), (1.0, 10.0)]));
    bar.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let domain = y.domain();
    assert_relative_eq!(domain[0].as_number().expect("min"), 0.0);
    assert_relative_eq!(domain[1].as_number().expect("max"), 10.5);

    // Moving the baseline re-domains automatically.
    bar.set_baseline(-20.0);
    let domain = y.domain();
    assert_relative_eq!(domain[0].as_number().expect("min"), -20.0);
}

#[test]
fn banded_position_scale_drives_bar_width() {
    let x = Scale::category();
    x.set_range((0.0, 230.0));
    let bar = BarPlot::new(BarOrientation::Vertical);
    bar.set_x(
        Accessor::field(|p: &(&'static str, f64)| DomainValue::text(p.0)),
        Some(x.clone()),
    );
    bar.set_y(Accessor::number(|p: &(&'static str, f64)| p.1), Some(identity_scale()));
    bar.plot()
        .add_dataset(Dataset::new(vec![("a", 1.0), ("b", 2.0)]));
    bar.plot()
        .anchor(Bounds::from_ranges((0.0, 230.0), (0.0, 100.0))).expect("anchor plot");

    let band = x.range_band().expect("category band");
    assert_relative_eq!(bar.bar_pixel_width(), band);
}

#[test]
fn destroying_the_base_plot_releases_the_baseline_scale_hooks() {
    let y = Scale::linear();
    let bar = BarPlot::new(BarOrientation::Vertical);
    bar.set_x(Accessor::number(|p: &(f64, f64)| p.0), Some(Scale::linear()));
    bar.set_y(Accessor::number(|p: &(f64, f64)| p.1), Some(y.clone()));
    bar.plot().add_dataset(Dataset::new(vec![(0.0, 5.0)]));
    bar.set_baseline(-20.0);
    bar.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let domain = y.domain();
    assert_relative_eq!(domain[0].as_number().expect("min"), -20.0);

    // Destroying through the base plot (not BarPlot::destroy) also
    // releases the baseline providers, so the scale re-domains without
    // the baseline contribution.
    bar.plot().destroy();
    let domain = y.domain();
    assert_relative_eq!(domain[0].as_number().expect("min"), 0.0);
    assert_relative_eq!(domain[1].as_number().expect("max"), 1.0);
}

// Pie ----------------------------------------------------------------------

#[test]
fn pie_sectors_are_proportional_and_exclude_invalid_values() {
    let pie = PiePlot::new();
    pie.set_sector_value(Accessor::number(|v: &f64| *v), None);
    pie.set_dataset(Dataset::new(vec![1.0, 3.0, -5.0, f64::NAN]));
    pie.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let angles = pie.sector_angles();
    assert_eq!(angles.len(), 4);

    let first = angles[0].expect("first sector");
    assert_relative_eq!(first.start, 0.0);
    assert_relative_eq!(first.end, TAU / 4.0);

    let second = angles[1].expect("second sector");
    assert_relative_eq!(second.end, TAU);

    assert!(angles[2].is_none());
    assert!(angles[3].is_none());
}

#[test]
fn pie_renders_a_single_dataset_only() {
    let pie: PiePlot<f64> = PiePlot::new();
    pie.add_dataset(Dataset::new(vec![1.0]));
    pie.add_dataset(Dataset::new(vec![2.0]));
    assert_eq!(pie.plot().datasets().len(), 1);
    assert_eq!(pie.plot().datasets()[0].len(), 1);
}

#[test]
fn pie_sector_lookup_respects_radius_and_angle() {
    let pie = PiePlot::new();
    pie.set_sector_value(Accessor::number(|v: &f64| *v), None);
    pie.set_dataset(Dataset::new(vec![1.0, 1.0]));
    pie.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // Center (50, 50), outer radius 50. Right half is sector 0, left is 1.
    assert_eq!(pie.sector_at(Point::new(70.0, 50.0)), Some(0));
    assert_eq!(pie.sector_at(Point::new(30.0, 50.0)), Some(1));
    // Beyond the outer radius.
    assert_eq!(pie.sector_at(Point::new(100.0, 0.0)), None);

    pie.set_inner_radius(20.0);
    // Inside the donut hole.
    assert_eq!(pie.sector_at(Point::new(55.0, 50.0)), None);
}

// Waterfall ----------------------------------------------------------------

#[derive(Clone)]
struct Step {
    label: f64,
    delta: f64,
    total: bool,
}

fn step(label: f64, delta: f64, total: bool) -> Step {
    Step { label, delta, total }
}

#[test]
fn waterfall_bars_walk_the_running_total_and_totals_reanchor() {
    let waterfall = WaterfallPlot::new();
    waterfall.set_x(Accessor::number(|s: &Step| s.label), Some(identity_scale()));
    waterfall.set_y(Accessor::number(|s: &Step| s.delta), Some(Scale::linear()));
    waterfall.set_total(Accessor::number(|s: &Step| if s.total { 1.0 } else { 0.0 }));
    waterfall.plot().add_dataset(Dataset::new(vec![
        step(0.0, 100.0, false),
        step(1.0, -20.0, false),
        step(2.0, 30.0, false),
        step(3.0, 110.0, true),
    ]));
    waterfall
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let spans = waterfall.bar_spans();
    assert_eq!(spans[0], Some((0.0, 100.0)));
    assert_eq!(spans[1], Some((100.0, 80.0)));
    assert_eq!(spans[2], Some((80.0, 110.0)));
    assert_eq!(spans[3], Some((0.0, 110.0)));
}

#[test]
fn waterfall_extent_covers_the_whole_walk_including_zero() {
    let y = Scale::linear();
    let waterfall = WaterfallPlot::new();
    waterfall.set_x(Accessor::number(|s: &Step| s.label), Some(Scale::linear()));
    waterfall.set_y(Accessor::number(|s: &Step| s.delta), Some(y.clone()));
    waterfall.plot().add_dataset(Dataset::new(vec![
        step(0.0, -30.0, false),
        step(1.0, 100.0, false),
    ]));
    waterfall
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // The walk visits -30 and 70; zero is always included.
    let domain = y.domain();
    let min = domain[0].as_number().expect("min");
    let max = domain[1].as_number().expect("max");
    assert!(min <= -30.0);
    assert!(max >= 70.0);
}

#[test]
fn waterfall_renders_a_single_dataset_only() {
    let waterfall: WaterfallPlot<Step> = WaterfallPlot::new();
    waterfall.add_dataset(Dataset::new(vec![step(0.0, 10.0, false)]));
    waterfall.add_dataset(Dataset::new(vec![
        step(1.0, 20.0, false),
        step(2.0, 5.0, false),
    ]));
    assert_eq!(waterfall.plot().datasets().len(), 1);
    assert_eq!(waterfall.plot().datasets()[0].len(), 1);
}

#[test]
fn waterfall_geometry_ignores_datasets_outside_the_walk() {
    let waterfall = WaterfallPlot::new();
    waterfall.set_x(Accessor::number(|s: &Step| s.label), Some(identity_scale()));
    waterfall.set_y(Accessor::number(|s: &Step| s.delta), Some(identity_scale()));
    waterfall
        .plot()
        .add_dataset(Dataset::new(vec![step(20.0, 10.0, false)]));
    // Added behind the kind's back; the cumulative walk never sees it.
    let stray = Dataset::new(vec![step(50.0, 10.0, false)]);
    waterfall.plot().add_dataset(stray);
    waterfall
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    // The walked bar hit-tests; the stray datum gets no bar, in
    // particular not the first dataset's span at its own index.
    assert_eq!(waterfall.plot().entities_at(Point::new(20.0, 5.0)).len(), 1);
    assert!(waterfall.plot().entities_at(Point::new(50.0, 5.0)).is_empty());
}

// Rectangle ----------------------------------------------------------------

#[test]
fn rectangle_uses_explicit_far_edges_when_bound() {
    let rectangle = RectanglePlot::new();
    rectangle.set_x(Accessor::number(|r: &[f64; 4]| r[0]), Some(identity_scale()));
    rectangle.set_y(Accessor::number(|r: &[f64; 4]| r[1]), Some(identity_scale()));
    rectangle.set_x2(Accessor::number(|r: &[f64; 4]| r[2]));
    rectangle.set_y2(Accessor::number(|r: &[f64; 4]| r[3]));
    rectangle
        .plot()
        .add_dataset(Dataset::new(vec![[10.0, 20.0, 30.0, 60.0]]));
    rectangle
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let entities = rectangle.plot().entities(None);
    assert_eq!(entities.len(), 1);
    assert_relative_eq!(entities[0].position.x, 20.0);
    assert_relative_eq!(entities[0].position.y, 40.0);

    assert_eq!(rectangle.plot().entities_at(Point::new(15.0, 50.0)).len(), 1);
    assert!(rectangle.plot().entities_at(Point::new(35.0, 50.0)).is_empty());
}

#[test]
fn rectangle_falls_back_to_the_category_band_for_missing_edges() {
    let x = Scale::category();
    x.set_range((0.0, 100.0));
    let rectangle = RectanglePlot::new();
    rectangle.set_x(
        Accessor::field(|r: &(&'static str, f64, f64, f64)| DomainValue::text(r.0)),
        Some(x.clone()),
    );
    rectangle.set_y(
        Accessor::number(|r: &(&'static str, f64, f64, f64)| r.1),
        Some(identity_scale()),
    );
    rectangle.set_y2(Accessor::number(|r: &(&'static str, f64, f64, f64)| r.2));
    rectangle
        .plot()
        .add_dataset(Dataset::new(vec![("a", 10.0, 20.0, 0.0)]));
    rectangle
        .plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let store_entities = rectangle.plot().entities(None);
    assert_eq!(store_entities.len(), 1);

    let band = x.range_band().expect("category band");
    let center = x.scale(&DomainValue::text("a"));
    let geometry = EntityGeometry::Rect(Bounds::from_ranges(
        (center - band / 2.0, center + band / 2.0),
        (10.0, 20.0),
    ));
    // The hit region matches the band-wide rectangle.
    assert_eq!(
        rectangle
            .plot()
            .entities_at(Point::new(center, 15.0))
            .len(),
        1
    );
    assert!(geometry.contains(Point::new(center, 15.0), 0.0));
}

use approx::assert_relative_eq;
use plotive::core::{Accessor, Bounds, Dataset, DomainValue, Scale};
use plotive::plot::XyPlot;

#[derive(Clone)]
struct Pt {
    x: f64,
    y: f64,
}

fn pt(x: f64, y: f64) -> Pt {
    Pt { x, y }
}

fn anchored_xy(data: Vec<Pt>, x_scale: &Scale, y_scale: &Scale) -> XyPlot<Pt> {
    let xy = XyPlot::new();
    xy.set_x(Accessor::number(|p: &Pt| p.x), Some(x_scale.clone()));
    xy.set_y(Accessor::number(|p: &Pt| p.y), Some(y_scale.clone()));
    xy.plot().add_dataset(Dataset::new(data));
    xy.plot()
        .anchor(Bounds::from_ranges((0.0, 400.0), (0.0, 300.0))).expect("anchor plot");
    xy
}

fn numeric_domain(scale: &Scale) -> (f64, f64) {
    let domain = scale.domain();
    let start = domain[0].as_number().expect("numeric domain start");
    let end = domain[1].as_number().expect("numeric domain end");
    (start, end)
}

#[test]
fn linear_scale_auto_domains_to_padded_data_extent() {
    let x = Scale::linear();
    let y = Scale::linear();
    let _xy = anchored_xy(vec![pt(1.0, 10.0), pt(5.0, 30.0)], &x, &y);

    // 5% padding on a span of 4.
    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, 0.8);
    assert_relative_eq!(max, 5.2);

    let (min, max) = numeric_domain(&y);
    assert_relative_eq!(min, 9.0);
    assert_relative_eq!(max, 31.0);
}

#[test]
fn auto_domain_follows_data_updates() {
    let x = Scale::linear();
    let y = Scale::linear();
    let xy = anchored_xy(vec![pt(0.0, 0.0), pt(10.0, 10.0)], &x, &y);

    let dataset = xy.plot().datasets().remove(0);
    dataset.set_data(vec![pt(0.0, 0.0), pt(100.0, 10.0)]);

    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, -5.0);
    assert_relative_eq!(max, 105.0);
}

#[test]
fn explicit_domain_disables_automatic_mode_until_reenabled() {
    let x = Scale::linear();
    let y = Scale::linear();
    let xy = anchored_xy(vec![pt(0.0, 0.0), pt(10.0, 10.0)], &x, &y);

    x.set_domain(&[DomainValue::number(-1.0), DomainValue::number(1.0)])
        .expect("set explicit domain");
    let dataset = xy.plot().datasets().remove(0);
    dataset.set_data(vec![pt(500.0, 0.0), pt(600.0, 1.0)]);
    assert_eq!(numeric_domain(&x), (-1.0, 1.0));

    x.auto_domain();
    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, 495.0);
    assert_relative_eq!(max, 605.0);
}

#[test]
fn category_domain_keeps_first_appearance_order_and_dedupes() {
    let x = Scale::category();
    let y = Scale::linear();
    let xy = XyPlot::new();
    xy.set_x(
        Accessor::field(|label: &(&'static str, f64)| DomainValue::text(label.0)),
        Some(x.clone()),
    );
    xy.set_y(Accessor::number(|label: &(&'static str, f64)| label.1), Some(y));
    xy.plot().add_dataset(Dataset::new(vec![
        ("b", 1.0),
        ("a", 2.0),
        ("b", 3.0),
        ("c", 4.0),
    ]));
    xy.plot()
        .anchor(Bounds::from_ranges((0.0, 300.0), (0.0, 100.0))).expect("anchor plot");

    let domain: Vec<String> = x
        .domain()
        .iter()
        .map(DomainValue::normalized_key)
        .collect();
    assert_eq!(domain, ["b", "a", "c"]);
}

#[test]
fn shared_scale_aggregates_extents_across_plots() {
    let x = Scale::linear();
    let _left = anchored_xy(vec![pt(0.0, 0.0), pt(10.0, 1.0)], &x, &Scale::linear());
    let _right = anchored_xy(vec![pt(100.0, 0.0), pt(200.0, 1.0)], &x, &Scale::linear());

    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, -10.0);
    assert_relative_eq!(max, 210.0);
}

#[test]
fn removing_a_dataset_shrinks_the_domain() {
    let x = Scale::linear();
    let y = Scale::linear();
    let xy = anchored_xy(vec![pt(0.0, 0.0), pt(10.0, 1.0)], &x, &y);
    let wide = Dataset::new(vec![pt(1000.0, 0.0)]);
    xy.plot().add_dataset(wide.clone());

    let (_, max) = numeric_domain(&x);
    assert!(max > 1000.0);

    xy.plot().remove_dataset(&wide);
    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, -0.5);
    assert_relative_eq!(max, 10.5);
}

#[test]
fn unanchored_plot_contributes_no_values() {
    let x = Scale::linear();
    let xy = XyPlot::new();
    xy.set_x(Accessor::number(|p: &Pt| p.x), Some(x.clone()));
    xy.set_y(Accessor::number(|p: &Pt| p.y), Some(Scale::linear()));
    xy.plot().add_dataset(Dataset::new(vec![pt(50.0, 1.0)]));

    // Never anchored: the scale keeps its default domain.
    x.auto_domain();
    assert_eq!(numeric_domain(&x), (0.0, 1.0));
}

#[test]
fn destroyed_plot_releases_its_scale_hooks() {
    let x = Scale::linear();
    let y = Scale::linear();
    let xy = anchored_xy(vec![pt(0.0, 0.0), pt(10.0, 1.0)], &x, &y);

    xy.destroy();
    x.auto_domain();
    assert_eq!(numeric_domain(&x), (0.0, 1.0));
}

#[test]
fn text_values_under_a_quantitative_scale_are_ignored() {
    let x = Scale::linear();
    let xy = XyPlot::new();
    xy.set_x(
        Accessor::field(|value: &DomainValue| value.clone()),
        Some(x.clone()),
    );
    xy.set_y(Accessor::constant(0.0), Some(Scale::linear()));
    xy.plot().add_dataset(Dataset::new(vec![
        DomainValue::number(2.0),
        DomainValue::text("not a number"),
        DomainValue::number(f64::NAN),
        DomainValue::number(8.0),
    ]));
    xy.plot()
        .anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");

    let (min, max) = numeric_domain(&x);
    assert_relative_eq!(min, 1.7);
    assert_relative_eq!(max, 8.3);
}

use std::cell::Cell;
use std::rc::Rc;

use plotive::core::{Accessor, Bounds, Dataset, DomainValue};
use plotive::error::PlotError;
use plotive::plot::{Plot, PlotStatus};
use plotive::render::NullDrawerRegistry;

fn anchored_plot(registry: &NullDrawerRegistry, data: Vec<f64>) -> (Plot<f64>, Dataset<f64>) {
    let plot = Plot::new();
    plot.set_drawer_factory(registry.factory());
    let dataset = Dataset::new(data);
    plot.add_dataset(dataset.clone());
    plot.anchor(Bounds::from_ranges((0.0, 100.0), (0.0, 100.0))).expect("anchor plot");
    (plot, dataset)
}

#[test]
fn render_immediately_draws_every_dataset_with_its_indices() {
    let registry = NullDrawerRegistry::new();
    let (plot, _dataset) = anchored_plot(&registry, vec![1.0, 2.0, 3.0]);
    plot.set_attr("fill", Accessor::constant("steelblue"), None);

    plot.render_immediately();

    let drawers = registry.drawers();
    assert_eq!(drawers.len(), 1);
    assert_eq!(drawers[0].draw_count(), 1);
    assert_eq!(drawers[0].last_indices(), vec![0, 1, 2]);
    assert_eq!(drawers[0].last_step_count(), 1);
}

#[test]
fn unanchored_and_destroyed_plots_do_not_draw() {
    let registry = NullDrawerRegistry::new();
    let plot: Plot<f64> = Plot::new();
    plot.set_drawer_factory(registry.factory());
    plot.add_dataset(Dataset::new(vec![1.0]));

    assert_eq!(plot.render_immediately(), 0.0);
    assert!(registry.drawers().iter().all(|d| d.draw_count() == 0));

    plot.anchor(Bounds::from_ranges((0.0, 10.0), (0.0, 10.0))).expect("anchor plot");
    plot.destroy();
    assert_eq!(plot.status(), PlotStatus::Destroyed);
    assert_eq!(plot.render_immediately(), 0.0);
    assert!(registry.drawers().iter().all(|d| d.draw_count() == 0));
}

#[test]
fn animated_render_adds_a_reset_step_only_while_data_is_fresh() {
    let registry = NullDrawerRegistry::new();
    let (plot, dataset) = anchored_plot(&registry, vec![1.0, 2.0]);
    plot.set_animated(true);
    plot.set_reset_projectors(Some(Rc::new(|table| table)));

    assert!(plot.animate_on_next_render());
    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_step_count(), 2);

    // Data unchanged: the follow-up render is a plain single step.
    assert!(!plot.animate_on_next_render());
    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_step_count(), 1);

    // New data re-arms the animation.
    dataset.set_data(vec![3.0]);
    assert!(plot.animate_on_next_render());
    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_step_count(), 2);
}

#[test]
fn post_paint_hook_receives_the_longest_draw_time() {
    let registry = NullDrawerRegistry::new();
    let plot: Plot<f64> = Plot::new();
    plot.set_drawer_factory(registry.factory());
    plot.add_dataset(Dataset::new(vec![1.0]));
    plot.add_dataset(Dataset::new(vec![2.0]));
    plot.anchor(Bounds::from_ranges((0.0, 10.0), (0.0, 10.0))).expect("anchor plot");

    registry.drawers()[0].set_draw_time_ms(120.0);
    registry.drawers()[1].set_draw_time_ms(450.0);

    let observed = Rc::new(Cell::new(0.0));
    let sink = Rc::clone(&observed);
    plot.set_post_paint(Some(Rc::new(move |time| sink.set(time))));

    let total = plot.render_immediately();
    assert_eq!(total, 450.0);
    assert_eq!(observed.get(), 450.0);
}

#[test]
fn render_requests_coalesce_until_taken() {
    let registry = NullDrawerRegistry::new();
    let (plot, dataset) = anchored_plot(&registry, vec![1.0]);

    let _ = plot.take_render_request();
    dataset.set_data(vec![2.0]);
    dataset.set_data(vec![3.0]);

    assert!(plot.take_render_request());
    assert!(!plot.take_render_request());
    assert!(plot.render_request_count() >= 2);
}

#[test]
fn changing_the_data_filter_invalidates_the_drawn_indices() {
    let registry = NullDrawerRegistry::new();
    let (plot, _dataset) = anchored_plot(&registry, vec![1.0, 2.0, 3.0]);

    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_indices(), vec![0, 1, 2]);

    plot.set_data_filter(Some(Rc::new(|_, index, _| index != 1)));
    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_indices(), vec![0, 2]);

    plot.set_data_filter(None);
    plot.render_immediately();
    assert_eq!(registry.drawers()[0].last_indices(), vec![0, 1, 2]);
}

#[test]
fn removing_an_absent_dataset_is_a_no_op() {
    let registry = NullDrawerRegistry::new();
    let (plot, dataset) = anchored_plot(&registry, vec![1.0]);

    let _ = plot.take_render_request();
    plot.remove_dataset(&Dataset::new(vec![9.0]));
    assert!(!plot.take_render_request());
    assert_eq!(plot.datasets(), vec![dataset]);
}

#[test]
fn projector_table_prefers_user_attrs_over_kind_projectors() {
    let registry = NullDrawerRegistry::new();
    let (plot, dataset) = anchored_plot(&registry, vec![1.0]);
    plot.set_attr("width", Accessor::constant(3.0), None);
    plot.set_property_projectors(Some(Rc::new(|| {
        let mut table = plotive::render::AttributeToProjector::<f64>::new();
        table.insert(
            "width".to_owned(),
            Rc::new(|_, _, _| DomainValue::number(99.0)),
        );
        table.insert(
            "height".to_owned(),
            Rc::new(|_, _, _| DomainValue::number(7.0)),
        );
        table
    })));

    let table = plot.generate_attr_to_projector();
    let datum = 1.0;
    let width = table["width"](&datum, 0, &dataset);
    let height = table["height"](&datum, 0, &dataset);
    assert_eq!(width.as_number(), Some(3.0));
    assert_eq!(height.as_number(), Some(7.0));
}

#[test]
fn destroy_removes_drawers_and_detaches_datasets() {
    let registry = NullDrawerRegistry::new();
    let (plot, dataset) = anchored_plot(&registry, vec![1.0]);

    plot.destroy();
    assert!(registry.drawers()[0].is_removed());
    assert!(plot.datasets().is_empty());

    // The dataset itself is still usable and no longer notifies the plot.
    let _ = plot.take_render_request();
    dataset.set_data(vec![9.0]);
    assert!(!plot.take_render_request());

    // Destroy is idempotent, and destroyed plots refuse to re-anchor.
    plot.destroy();
    assert!(matches!(
        plot.anchor(Bounds::from_ranges((0.0, 10.0), (0.0, 10.0))),
        Err(PlotError::Destroyed)
    ));
}

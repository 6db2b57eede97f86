use std::cell::{Cell, RefCell};
use std::rc::Rc;

use plotive::Dataset;
use serde_json::json;

#[test]
fn revision_bumps_on_data_and_metadata_mutation() {
    let dataset = Dataset::new(vec![1.0, 2.0]);
    assert_eq!(dataset.revision(), 0);

    dataset.set_data(vec![3.0]);
    assert_eq!(dataset.revision(), 1);
    assert_eq!(&*dataset.data(), &[3.0]);

    dataset.set_metadata(json!({ "label": "series a" }));
    assert_eq!(dataset.revision(), 2);
    assert_eq!(dataset.metadata()["label"], "series a");
}

#[test]
fn subscribers_run_in_registration_order_and_see_final_state() {
    let dataset = Dataset::new(vec![0.0]);
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let first = Rc::clone(&order);
    dataset.on_update(move |dataset| {
        assert_eq!(dataset.len(), 2);
        first.borrow_mut().push("first");
    });
    let second = Rc::clone(&order);
    dataset.on_update(move |_| second.borrow_mut().push("second"));

    dataset.set_data(vec![1.0, 2.0]);
    assert_eq!(&*order.borrow(), &["first", "second"]);
}

#[test]
fn unsubscribed_callback_stops_firing() {
    let dataset = Dataset::new(Vec::<f64>::new());
    let calls = Rc::new(Cell::new(0));

    let counter = Rc::clone(&calls);
    let subscription = dataset.on_update(move |_| counter.set(counter.get() + 1));

    dataset.set_data(vec![1.0]);
    assert!(dataset.off_update(subscription));
    dataset.set_data(vec![2.0]);

    assert_eq!(calls.get(), 1);
    assert!(!dataset.off_update(subscription));
}

#[test]
fn callback_registered_during_dispatch_waits_for_the_next_update() {
    let dataset = Dataset::new(Vec::<f64>::new());
    let late_calls = Rc::new(Cell::new(0));

    let handle = dataset.clone();
    let late = Rc::clone(&late_calls);
    let armed = Rc::new(Cell::new(false));
    let armed_flag = Rc::clone(&armed);
    dataset.on_update(move |_| {
        if !armed_flag.get() {
            armed_flag.set(true);
            let late = Rc::clone(&late);
            handle.on_update(move |_| late.set(late.get() + 1));
        }
    });

    dataset.set_data(vec![1.0]);
    assert_eq!(late_calls.get(), 0);

    dataset.set_data(vec![2.0]);
    assert_eq!(late_calls.get(), 1);
}

#[test]
fn dataset_handles_compare_by_identity() {
    let a = Dataset::new(vec![1]);
    let b = Dataset::new(vec![1]);
    let a_clone = a.clone();

    assert_eq!(a, a_clone);
    assert_eq!(a.id(), a_clone.id());
    assert_ne!(a, b);
}

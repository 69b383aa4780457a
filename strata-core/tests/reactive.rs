//! Reactive cells and effects, alone and bound to entity attributes.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use common::{client, object, StubTransport, User};
use strata_core::reactive::{ReactiveContext, Runtime, SubscriberId};
use strata_core::{Effect, Entity, ReactiveCell};

#[test]
fn effect_reruns_when_a_cell_it_read_changes() {
    let cell = ReactiveCell::new(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let source = cell.clone();
    let sink = Arc::clone(&seen);
    let effect = Effect::new(move || sink.lock().push(source.get()));

    cell.set(2);
    cell.update(|n| n + 1);

    assert_eq!(*seen.lock(), vec![1, 2, 3]);
    assert_eq!(effect.run_count(), 3);
}

#[test]
fn untracked_reads_do_not_subscribe() {
    let cell = ReactiveCell::new(0);
    let source = cell.clone();
    let effect = Effect::new(move || {
        source.get_untracked();
    });

    cell.set(5);

    assert_eq!(effect.run_count(), 1);
    assert_eq!(effect.dependency_count(), 0);
}

#[test]
fn disposed_effect_stops_running() {
    let cell = ReactiveCell::new("a".to_string());
    let source = cell.clone();
    let effect = Effect::new(move || {
        source.get();
    });

    effect.dispose();
    cell.set("b".to_string());

    assert!(effect.is_disposed());
    assert_eq!(effect.run_count(), 1);
    assert_eq!(Runtime::dependent_count(cell.id()), 0);
}

#[test]
fn dependencies_follow_the_branch_taken() {
    let flag = ReactiveCell::new(true);
    let left = ReactiveCell::new(1);
    let right = ReactiveCell::new(2);
    let (f, l, r) = (flag.clone(), left.clone(), right.clone());
    let effect = Effect::new(move || {
        if f.get() {
            l.get();
        } else {
            r.get();
        }
    });
    assert_eq!(effect.dependency_count(), 2);

    flag.set(false);
    let runs = effect.run_count();
    left.set(10);

    assert_eq!(effect.run_count(), runs);
    right.set(20);
    assert_eq!(effect.run_count(), runs + 1);
}

#[test]
fn context_collects_reads_per_frame() {
    let a = ReactiveCell::new(1);
    let b = ReactiveCell::new(2);

    let _outer = ReactiveContext::enter(SubscriberId::new());
    a.get();
    {
        let _inner = ReactiveContext::enter(SubscriberId::new());
        b.get();
        assert_eq!(ReactiveContext::get_dependencies(), vec![b.id()]);
    }
    a.get();
    assert_eq!(ReactiveContext::get_dependencies(), vec![a.id()]);
}

#[test]
fn listeners_see_each_write() {
    let cell = ReactiveCell::new(0_usize);
    let total = Arc::new(AtomicUsize::new(0));
    let sum = Arc::clone(&total);
    let id = cell.subscribe(move |n: &usize| {
        sum.fetch_add(*n, Ordering::SeqCst);
    });

    cell.set(3);
    cell.set(4);
    cell.unsubscribe(id);
    cell.set(100);

    assert_eq!(total.load(Ordering::SeqCst), 7);
}

#[test]
fn effect_over_entity_attribute_tracks_edits() {
    let stub = StubTransport::new();
    let entity = Entity::<User>::new(client(&stub), object(json!({"id": 1, "name": "Ann"}))).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let source = entity.clone();
    let sink = Arc::clone(&seen);
    let _effect = Effect::new(move || {
        if let Ok(name) = source.attr("name") {
            sink.lock().push(name);
        }
    });

    entity.set_attr("name", "Bea").unwrap();
    entity.restore().unwrap();

    assert_eq!(*seen.lock(), vec![json!("Ann"), json!("Bea"), json!("Ann")]);
}

#[tokio::test]
async fn effect_over_entity_attribute_sees_fetched_data() {
    let stub = StubTransport::new();
    stub.respond(json!({"user": {"id": 3, "name": "Ann", "email": "ann@x.io"}}));
    let entity = Entity::<User>::with_id(client(&stub), 3).unwrap();
    let latest = Arc::new(Mutex::new(Value::Null));

    let cell = entity.cell("email").unwrap();
    let sink = Arc::clone(&latest);
    let effect = Effect::new(move || *sink.lock() = cell.get());
    assert_eq!(*latest.lock(), Value::Null);

    entity.fetch_query().await.unwrap();

    assert_eq!(*latest.lock(), json!("ann@x.io"));
    assert!(effect.run_count() >= 2);
}

//! End-to-end lifecycle scenarios against the in-memory document.
//!
//! Each test builds a document, attaches a [`Lifecycle`], edits the tree the
//! way application code would, then runs a microtask checkpoint to deliver
//! the batched mutation records.

use std::cell::RefCell;
use std::rc::Rc;

use domian::prelude::*;
use pretty_assertions::assert_eq;

/// Ordered log of `"<event> <component> <element id>"` entries.
#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    fn component(&self, name: &str) -> Component {
        let (m, u, x) = (self.clone(), self.clone(), self.clone());
        let (nm, nu, nx) = (name.to_owned(), name.to_owned(), name.to_owned());
        Component::new(name)
            .on_mount(move |n| m.push(format!("mount {nm} {}", n.id())))
            .on_update(move |n| u.push(format!("update {nu} {}", n.id())))
            .on_unmount(move |n| x.push(format!("unmount {nx} {}", n.id())))
    }

    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    fn count(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

fn element(doc: &Document, class: &str, id: &str) -> Node {
    let el = doc.create_element("div");
    el.set_class_name(class).unwrap();
    el.set_attribute("id", id).unwrap();
    el
}

fn flush(doc: &Document) {
    doc.perform_microtask_checkpoint().unwrap();
}

#[test]
fn mounts_existing_instance_during_construction() {
    let doc = Document::with_body(r#"<div class="test" id="pre"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    assert_eq!(journal.take(), vec!["mount test pre"]);
}

#[test]
fn mounts_each_appended_instance() {
    let doc = Document::new();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();

    doc.body().append_child(&element(&doc, "test", "a")).unwrap();
    doc.body().append_child(&element(&doc, "test", "b")).unwrap();
    assert!(journal.take().is_empty(), "nothing fires before delivery");

    flush(&doc);
    assert_eq!(journal.take(), vec!["mount test a", "mount test b"]);
}

#[test]
fn mounts_appends_delivered_in_separate_batches() {
    let doc = Document::new();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();

    for id in ["a", "b"] {
        doc.body().append_child(&element(&doc, "test", id)).unwrap();
        flush(&doc);
    }
    assert_eq!(journal.count("mount test"), 2);
}

#[test]
fn unmounts_when_container_contents_are_replaced() {
    let doc = Document::with_body(
        r#"<div id="container"><div class="test" id="victim"></div></div>"#,
    )
    .unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    let container = doc.get_element_by_id("container").unwrap();
    container.set_inner_html("<div></div>").unwrap();
    flush(&doc);

    assert_eq!(journal.take(), vec!["unmount test victim"]);
}

#[test]
fn updates_on_attribute_change_even_with_same_value() {
    let doc = Document::with_body(r#"<div class="test" id="t"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    let el = doc.get_element_by_id("t").unwrap();
    el.set_attribute("test", "1").unwrap();
    flush(&doc);
    assert_eq!(journal.take(), vec!["update test t"]);

    el.set_attribute("test", "1").unwrap();
    flush(&doc);
    assert_eq!(journal.take(), vec!["update test t"]);
}

#[test]
fn updates_on_child_change() {
    let doc = Document::with_body(r#"<div class="test" id="t"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    doc.get_element_by_id("t")
        .unwrap()
        .set_inner_html("hello")
        .unwrap();
    flush(&doc);
    assert_eq!(journal.take(), vec!["update test t"]);
}

#[test]
fn handlers_receive_the_affected_element() {
    let doc = Document::new();
    let received: Rc<RefCell<Vec<Node>>> = Rc::default();
    let (m, u, x) = (
        Rc::clone(&received),
        Rc::clone(&received),
        Rc::clone(&received),
    );
    let _lifecycle = Lifecycle::new(
        doc.clone(),
        Component::new("test")
            .on_mount(move |n| m.borrow_mut().push(n.clone()))
            .on_update(move |n| u.borrow_mut().push(n.clone()))
            .on_unmount(move |n| x.borrow_mut().push(n.clone())),
    )
    .unwrap();

    let el = element(&doc, "test", "one");
    doc.body().append_child(&el).unwrap();
    flush(&doc);
    el.set_attribute("data-x", "y").unwrap();
    flush(&doc);
    el.remove();
    flush(&doc);

    assert_eq!(*received.borrow(), vec![el.clone(), el.clone(), el]);
}

#[test]
fn multiple_components_dispatch_independently() {
    let doc = Document::with_body(
        r#"<div class="test" id="a"></div><div class="test2" id="b"></div>"#,
    )
    .unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(
        doc.clone(),
        vec![journal.component("test"), journal.component("test2")],
    )
    .unwrap();
    assert_eq!(journal.take(), vec!["mount test a", "mount test2 b"]);

    doc.get_element_by_id("b")
        .unwrap()
        .set_attribute("x", "1")
        .unwrap();
    flush(&doc);
    assert_eq!(journal.take(), vec!["update test2 b"]);
}

#[test]
fn child_list_record_updates_parent_then_mounts_then_unmounts() {
    let doc = Document::with_body(
        r#"<div class="list" id="list"><div class="item" id="old"></div></div>"#,
    )
    .unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(
        doc.clone(),
        [journal.component("list"), journal.component("item")],
    )
    .unwrap();
    journal.take();

    let list = doc.get_element_by_id("list").unwrap();
    list.replace_children(&[element(&doc, "item", "new")]).unwrap();
    flush(&doc);

    assert_eq!(
        journal.take(),
        vec!["update list list", "mount item new", "unmount item old"]
    );
}

#[test]
fn moving_an_instance_unmounts_then_mounts() {
    let doc = Document::with_body(
        r#"<div id="from"><div class="test" id="m"></div></div><div id="to"></div>"#,
    )
    .unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    let moving = doc.get_element_by_id("m").unwrap();
    doc.get_element_by_id("to")
        .unwrap()
        .append_child(&moving)
        .unwrap();
    flush(&doc);

    assert_eq!(journal.take(), vec!["unmount test m", "mount test m"]);
}

#[test]
fn only_direct_additions_are_mounted() {
    let doc = Document::new();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();

    let wrapper = doc.create_element("section");
    wrapper.append_child(&element(&doc, "test", "nested")).unwrap();
    doc.body().append_child(&wrapper).unwrap();
    flush(&doc);

    assert!(journal.take().is_empty());
}

#[test]
fn multi_class_elements_do_not_match_by_default() {
    let doc = Document::with_body(r#"<div class="test active" id="x"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();

    doc.body().append_child(&element(&doc, "test active", "y")).unwrap();
    doc.get_element_by_id("x")
        .unwrap()
        .set_attribute("data-a", "1")
        .unwrap();
    flush(&doc);

    assert!(journal.take().is_empty());
}

#[test]
fn token_matching_is_opt_in() {
    let doc = Document::with_body(r#"<div class="test active" id="x"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::with_config(
        doc.clone(),
        [journal.component("test"), journal.component("active")],
        LifecycleConfig::new().with_class_match(ClassMatch::Token),
    )
    .unwrap();
    assert_eq!(journal.take(), vec!["mount test x", "mount active x"]);

    doc.get_element_by_id("x").unwrap().remove();
    flush(&doc);
    assert_eq!(journal.take(), vec!["unmount test x", "unmount active x"]);
}

#[test]
fn changing_class_fires_update_not_mount() {
    let doc = Document::with_body(r#"<div class="test" id="c"></div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(
        doc.clone(),
        [journal.component("test"), journal.component("other")],
    )
    .unwrap();
    journal.take();

    doc.get_element_by_id("c")
        .unwrap()
        .set_class_name("other")
        .unwrap();
    flush(&doc);

    // The record is read against the live class string at delivery.
    assert_eq!(journal.take(), vec!["update other c"]);
}

#[test]
fn destroy_silences_every_handler() {
    let doc = Document::with_body(r#"<div class="test" id="t"></div>"#).unwrap();
    let journal = Journal::default();
    let mut lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    let el = doc.get_element_by_id("t").unwrap();
    el.set_attribute("a", "1").unwrap();
    lifecycle.destroy();
    flush(&doc);

    el.set_attribute("a", "2").unwrap();
    doc.body().append_child(&element(&doc, "test", "n")).unwrap();
    el.remove();
    flush(&doc);

    assert!(journal.take().is_empty());
    assert_eq!(lifecycle.state(), SubscriptionState::Destroyed);
}

#[test]
fn destroy_from_inside_a_handler_stops_the_batch() {
    let doc = Document::new();
    let journal = Journal::default();
    let slot = self_destroying(&doc, &journal);

    doc.body().append_child(&element(&doc, "stop", "s")).unwrap();
    doc.body().append_child(&element(&doc, "test", "late")).unwrap();
    flush(&doc);

    assert_eq!(journal.take(), vec!["mount stop s"]);
    assert!(!slot.borrow().as_ref().unwrap().is_active());
}

/// A lifecycle whose `stop` component destroys it on mount.
fn self_destroying(doc: &Document, journal: &Journal) -> Rc<RefCell<Option<DomLifecycle>>> {
    let slot: Rc<RefCell<Option<DomLifecycle>>> = Rc::default();
    let stopper = Rc::clone(&slot);
    let log = journal.clone();
    let lifecycle = Lifecycle::new(
        doc.clone(),
        vec![
            Component::new("stop").on_mount(move |n| {
                log.push(format!("mount stop {}", n.id()));
                if let Some(lifecycle) = stopper.borrow_mut().as_mut() {
                    lifecycle.destroy();
                }
            }),
            journal.component("test"),
        ],
    )
    .unwrap();
    *slot.borrow_mut() = Some(lifecycle);
    slot
}

#[test]
fn destroy_from_inside_a_handler_stops_the_current_record() {
    let doc = Document::new();
    let journal = Journal::default();
    let slot = self_destroying(&doc, &journal);

    doc.body()
        .append(&[element(&doc, "stop", "s"), element(&doc, "test", "late")])
        .unwrap();
    flush(&doc);

    assert_eq!(journal.take(), vec!["mount stop s"]);
    assert!(!slot.borrow().as_ref().unwrap().is_active());
}

#[test]
fn destroy_from_inside_a_handler_skips_removals_of_the_same_record() {
    let doc = Document::with_body(r#"<div class="test" id="old"></div>"#).unwrap();
    let journal = Journal::default();
    let _slot = self_destroying(&doc, &journal);
    assert_eq!(journal.take(), vec!["mount test old"]);

    doc.body()
        .set_inner_html(r#"<div class="stop" id="s"></div><div class="test" id="new"></div>"#)
        .unwrap();
    flush(&doc);

    assert_eq!(journal.take(), vec!["mount stop s"]);
}

#[test]
fn destroyed_lifecycles_release_their_handlers() {
    let doc = Document::new();
    let captured = Rc::new(());
    for round in 0..3 {
        let held = Rc::clone(&captured);
        let mut lifecycle = Lifecycle::new(
            doc.clone(),
            Component::new("test").on_mount(move |_| assert!(Rc::strong_count(&held) > 1)),
        )
        .unwrap();
        assert_eq!(doc.observer_count(), 1, "round {round}");
        assert_eq!(Rc::strong_count(&captured), 2);

        lifecycle.destroy();
        drop(lifecycle);
        assert_eq!(doc.observer_count(), 0);
        assert_eq!(Rc::strong_count(&captured), 1);
    }

    // Dropping without an explicit destroy frees the same way.
    let held = Rc::clone(&captured);
    let lifecycle = Lifecycle::new(
        doc.clone(),
        Component::new("test").on_unmount(move |_| assert!(Rc::strong_count(&held) > 1)),
    )
    .unwrap();
    drop(lifecycle);
    assert_eq!(Rc::strong_count(&captured), 1);
    assert_eq!(doc.observer_count(), 0);
}

#[test]
fn independent_instances_do_not_interfere() {
    let doc = Document::new();
    let first = Journal::default();
    let second = Journal::default();
    let mut a = Lifecycle::new(doc.clone(), first.component("test")).unwrap();
    let _b = Lifecycle::new(doc.clone(), second.component("test")).unwrap();

    doc.body().append_child(&element(&doc, "test", "x")).unwrap();
    flush(&doc);
    a.destroy();
    doc.body().append_child(&element(&doc, "test", "y")).unwrap();
    flush(&doc);

    assert_eq!(first.take(), vec!["mount test x"]);
    assert_eq!(second.take(), vec!["mount test x", "mount test y"]);
}

#[test]
fn handler_error_fails_fast_and_surfaces_from_delivery() {
    let doc = Document::new();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(
        doc.clone(),
        vec![
            Component::new("bad").try_on_mount(|_| Err("bad mount".into())),
            journal.component("test"),
        ],
    )
    .unwrap();

    doc.body().append_child(&element(&doc, "bad", "b")).unwrap();
    doc.body().append_child(&element(&doc, "test", "t")).unwrap();
    let err = doc.perform_microtask_checkpoint().unwrap_err();

    assert_eq!(err.errors.len(), 1);
    assert!(err.errors[0].to_string().contains("bad mount"));
    assert!(journal.take().is_empty(), "rest of the batch is skipped");
}

#[test]
fn isolate_policy_keeps_dispatching() {
    let doc = Document::new();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::with_config(
        doc.clone(),
        vec![
            Component::new("bad").try_on_mount(|_| Err("bad mount".into())),
            journal.component("test"),
        ],
        LifecycleConfig::new().with_dispatch_policy(DispatchPolicy::Isolate),
    )
    .unwrap();

    doc.body().append_child(&element(&doc, "bad", "b")).unwrap();
    doc.body().append_child(&element(&doc, "test", "t")).unwrap();
    let err = doc.perform_microtask_checkpoint().unwrap_err();

    assert_eq!(err.errors.len(), 1);
    assert_eq!(journal.take(), vec!["mount test t"]);
}

#[test]
fn text_data_changes_are_not_updates() {
    let doc = Document::with_body(r#"<div class="test" id="p">text</div>"#).unwrap();
    let journal = Journal::default();
    let _lifecycle = Lifecycle::new(doc.clone(), journal.component("test")).unwrap();
    journal.take();

    let p = doc.get_element_by_id("p").unwrap();
    p.child_nodes()[0].set_text_content("changed");
    flush(&doc);

    assert!(journal.take().is_empty());
}

mod tracing_capture {
    use std::sync::{Arc, Mutex};

    use domian::prelude::*;
    use pretty_assertions::assert_eq;
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    struct MessageCapture {
        messages: Arc<Mutex<Vec<(tracing::Level, String)>>>,
    }

    impl<S> Layer<S> for MessageCapture
    where
        S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Msg(Option<String>);
            impl tracing::field::Visit for Msg {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.0 = Some(value.to_owned());
                    }
                }

                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{value:?}").trim_matches('"').to_owned());
                    }
                }
            }
            let mut msg = Msg(None);
            event.record(&mut msg);
            if let Some(message) = msg.0
                && message.starts_with("lifecycle.")
            {
                self.messages
                    .lock()
                    .expect("capture lock")
                    .push((*event.metadata().level(), message));
            }
        }
    }

    #[test]
    fn lifecycle_events_are_traced() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(MessageCapture {
            messages: Arc::clone(&messages),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let doc = Document::with_body(r#"<div class="test"></div>"#).unwrap();
        let mut lifecycle = Lifecycle::new(
            doc.clone(),
            Component::new("test").on_mount(|_| {}).on_unmount(|_| {}),
        )
        .unwrap();
        doc.body().set_inner_html("").unwrap();
        doc.perform_microtask_checkpoint().unwrap();
        lifecycle.destroy();
        lifecycle.destroy();

        let captured = messages.lock().expect("capture lock");
        let names: Vec<&str> = captured.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "lifecycle.construct",
                "lifecycle.mount",
                "lifecycle.scan",
                "lifecycle.unmount",
                "lifecycle.destroy",
                "lifecycle.destroy.repeated",
            ]
        );
        assert_eq!(captured.last().map(|(level, _)| *level), Some(tracing::Level::WARN));
    }
}

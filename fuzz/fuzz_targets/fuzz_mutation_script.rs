#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use domian_core::{ComponentDescriptor, Lifecycle};
use domian_dom::{Document, Node};
use libfuzzer_sys::fuzz_target;

const CLASSES: [&str; 3] = ["test", "test other", ""];

#[derive(Arbitrary, Debug)]
enum Edit {
    Append { parent: u8, class: u8 },
    Insert { parent: u8, before: u8, node: u8 },
    Remove { target: u8 },
    Attribute { target: u8, value: bool },
    InnerHtml { target: u8, markup: String },
    Flush,
    Destroy,
}

fuzz_target!(|edits: Vec<Edit>| {
    let doc = Document::new();
    let calls = Rc::new(Cell::new(0usize));
    let (m, u, x) = (Rc::clone(&calls), Rc::clone(&calls), Rc::clone(&calls));
    let Ok(mut lifecycle) = Lifecycle::new(
        doc.clone(),
        ComponentDescriptor::<Node>::new("test")
            .on_mount(move |_| m.set(m.get() + 1))
            .on_update(move |_| u.set(u.get() + 1))
            .on_unmount(move |_| x.set(x.get() + 1)),
    ) else {
        return;
    };

    let mut pool: Vec<Node> = vec![doc.body()];
    let mut silenced_at: Option<usize> = None;
    let pick = |pool: &[Node], i: u8| pool[usize::from(i) % pool.len()].clone();

    for edit in edits.into_iter().take(256) {
        match edit {
            Edit::Append { parent, class } => {
                let el = doc.create_element("div");
                let _ = el.set_class_name(CLASSES[usize::from(class) % CLASSES.len()]);
                if pick(&pool, parent).append_child(&el).is_ok() {
                    pool.push(el);
                }
            }
            Edit::Insert { parent, before, node } => {
                let parent = pick(&pool, parent);
                let before = pick(&pool, before);
                let node = pick(&pool, node);
                // Hierarchy and not-found errors are expected here.
                let _ = parent.insert_before(&node, Some(&before));
            }
            Edit::Remove { target } => pick(&pool, target).remove(),
            Edit::Attribute { target, value } => {
                let _ = pick(&pool, target).set_attribute("data-v", if value { "1" } else { "0" });
            }
            Edit::InnerHtml { target, markup } => {
                let _ = pick(&pool, target).set_inner_html(&markup);
            }
            Edit::Flush => {
                let _ = doc.perform_microtask_checkpoint();
            }
            Edit::Destroy => {
                let _ = doc.perform_microtask_checkpoint();
                lifecycle.destroy();
                silenced_at.get_or_insert(calls.get());
            }
        }
        pool.retain(|n| n == &doc.body() || n.is_connected());
        if pool.is_empty() {
            pool.push(doc.body());
        }
    }

    let _ = doc.perform_microtask_checkpoint();
    if let Some(count) = silenced_at {
        assert_eq!(calls.get(), count, "handler ran after destroy");
    }
});

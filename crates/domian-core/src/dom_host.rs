//! [`Host`] for the in-memory document from `domian-dom`.
//!
//! Batches arrive when the embedder calls
//! [`Document::perform_microtask_checkpoint`]; a dispatch error comes back out
//! of that call inside its `DeliveryError`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use domian_dom::{
    CallbackError, Document, MutationKind, MutationObserver, MutationObserverInit, MutationRecord,
    Node,
};

use crate::error::HostError;
use crate::host::{ChangeCallback, ChangeRecord, Host, ObserverOptions};

type CallbackSlot = Rc<RefCell<Option<ChangeCallback<Node>>>>;

/// Live subscription on a [`Document`].
///
/// The lifecycle callback sits in a shared slot that `disconnect` empties,
/// which releases the dispatcher (and its document handle) even while a
/// delivery still holds the observer. Dropping the subscription afterwards
/// lets the document free the observer itself.
pub struct DomSubscription {
    observer: MutationObserver,
    slot: CallbackSlot,
    disconnected: Rc<Cell<bool>>,
}

impl std::fmt::Debug for DomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomSubscription")
            .field("observer", &self.observer)
            .field("disconnected", &self.disconnected.get())
            .finish()
    }
}

fn translate(record: MutationRecord) -> Option<ChangeRecord<Node>> {
    match record.kind {
        MutationKind::Attributes => Some(ChangeRecord::Attributes {
            target: record.target,
            attribute_name: record.attribute_name,
        }),
        MutationKind::ChildList => Some(ChangeRecord::ChildList {
            target: record.target,
            added: record.added_nodes,
            removed: record.removed_nodes,
        }),
        MutationKind::CharacterData => None,
    }
}

impl From<ObserverOptions> for MutationObserverInit {
    fn from(options: ObserverOptions) -> Self {
        Self {
            child_list: options.child_list,
            attributes: options.attributes,
            subtree: options.subtree,
            ..Self::default()
        }
    }
}

impl Host for Document {
    type Node = Node;
    type Subscription = DomSubscription;

    fn observed_root(&self) -> Result<Node, HostError> {
        Ok(self.body())
    }

    fn elements_in(&self, root: &Node) -> Vec<Node> {
        let mut elements = Vec::new();
        if root.is_element() {
            elements.push(root.clone());
        }
        elements.extend(root.descendant_elements());
        elements
    }

    fn class_name(&self, node: &Node) -> Option<String> {
        node.is_element().then(|| node.class_name())
    }

    fn observe(
        &self,
        root: &Node,
        options: ObserverOptions,
        callback: ChangeCallback<Node>,
    ) -> Result<DomSubscription, HostError> {
        let slot: CallbackSlot = Rc::new(RefCell::new(Some(callback)));
        let disconnected = Rc::new(Cell::new(false));

        let observer = {
            let slot = Rc::clone(&slot);
            let disconnected = Rc::clone(&disconnected);
            self.create_mutation_observer(move |records, _observer| {
                // Taken out for the call so a handler may disconnect.
                let Some(mut callback) = slot.borrow_mut().take() else {
                    return Ok(());
                };
                let batch: Vec<ChangeRecord<Node>> =
                    records.into_iter().filter_map(translate).collect();
                let result = if batch.is_empty() {
                    Ok(())
                } else {
                    callback(batch)
                };
                if !disconnected.get() {
                    *slot.borrow_mut() = Some(callback);
                }
                result.map_err(|err| Box::new(err) as CallbackError)
            })
        };

        observer
            .observe(root, options.into())
            .map_err(|err| HostError::ObserverUnavailable {
                reason: err.to_string(),
            })?;

        Ok(DomSubscription {
            observer,
            slot,
            disconnected,
        })
    }

    fn disconnect(&self, subscription: DomSubscription) {
        subscription.disconnected.set(true);
        subscription.observer.disconnect();
        subscription.slot.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use pretty_assertions::assert_eq;

    type Seen = Rc<RefCell<Vec<String>>>;

    fn describe(record: &ChangeRecord<Node>) -> String {
        match record {
            ChangeRecord::Attributes {
                target,
                attribute_name,
            } => format!(
                "attr {} {}",
                target.id(),
                attribute_name.as_deref().unwrap_or("?")
            ),
            ChangeRecord::ChildList {
                target,
                added,
                removed,
            } => format!("children {} +{} -{}", target.id(), added.len(), removed.len()),
        }
    }

    fn watch(doc: &Document, seen: &Seen) -> DomSubscription {
        let seen = Rc::clone(seen);
        let root = doc.observed_root().unwrap();
        doc.observe(
            &root,
            ObserverOptions::LIFECYCLE,
            Box::new(move |batch| {
                seen.borrow_mut().extend(batch.iter().map(describe));
                Ok(())
            }),
        )
        .unwrap()
    }

    #[test]
    fn elements_in_is_inclusive_document_order() {
        let doc = Document::with_body(
            r#"<div id="a"><span id="b">text</span></div><p id="c"></p>"#,
        )
        .unwrap();
        doc.body().set_attribute("id", "body").unwrap();
        let ids: Vec<String> = doc
            .elements_in(&doc.body())
            .iter()
            .map(Node::id)
            .collect();
        assert_eq!(ids, vec!["body", "a", "b", "c"]);
    }

    #[test]
    fn class_name_is_none_for_text() {
        let doc = Document::new();
        assert_eq!(doc.class_name(&doc.create_text_node("x")), None);
        assert_eq!(doc.class_name(&doc.create_element("div")), Some(String::new()));
    }

    #[test]
    fn batches_translate_and_drop_character_data() {
        let doc = Document::with_body(r#"<div id="host">x</div>"#).unwrap();
        let seen = Seen::default();
        let _subscription = watch(&doc, &seen);

        let host = doc.get_element_by_id("host").unwrap();
        host.set_attribute("test", "1").unwrap();
        host.set_inner_html("<b id='n'></b>").unwrap();
        doc.perform_microtask_checkpoint().unwrap();

        assert_eq!(*seen.borrow(), vec!["attr host test", "children host +1 -1"]);
    }

    #[test]
    fn disconnect_discards_pending_and_future() {
        let doc = Document::new();
        let seen = Seen::default();
        let subscription = watch(&doc, &seen);

        doc.body().append_child(&doc.create_element("i")).unwrap();
        doc.disconnect(subscription);
        doc.body().append_child(&doc.create_element("i")).unwrap();
        doc.perform_microtask_checkpoint().unwrap();

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn dispatch_errors_surface_from_checkpoint() {
        let doc = Document::new();
        let root = doc.body();
        let _subscription = doc
            .observe(
                &root,
                ObserverOptions::LIFECYCLE,
                Box::new(|_| {
                    Err(LifecycleError::handler(
                        "x",
                        crate::LifecycleEvent::Mount,
                        "broken".into(),
                    ))
                }),
            )
            .unwrap();
        root.append_child(&doc.create_element("i")).unwrap();
        let err = doc.perform_microtask_checkpoint().unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].to_string().contains("broken"));
    }

    #[test]
    fn options_map_onto_observer_init() {
        let init = MutationObserverInit::from(ObserverOptions::LIFECYCLE);
        assert_eq!(init, MutationObserverInit::subtree_changes());
    }
}

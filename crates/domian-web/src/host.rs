use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use domian_core::{ChangeCallback, ChangeRecord, Host, HostError, ObserverOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node, NodeList};

type CallbackSlot = Rc<RefCell<Option<ChangeCallback<Node>>>>;

/// Handle onto the page's `document`.
#[derive(Debug, Clone)]
pub struct WebHost {
    document: web_sys::Document,
}

impl WebHost {
    /// Attach to `window.document`.
    ///
    /// # Errors
    ///
    /// [`HostError::MissingRoot`] outside a window context or before
    /// `<body>` exists.
    pub fn from_window() -> Result<Self, HostError> {
        let window = web_sys::window().ok_or_else(|| missing("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| missing("window has no document"))?;
        Self::new(document)
    }

    /// Attach to an explicit document.
    ///
    /// # Errors
    ///
    /// [`HostError::MissingRoot`] when the document has no body.
    pub fn new(document: web_sys::Document) -> Result<Self, HostError> {
        if document.body().is_none() {
            return Err(missing("document has no body"));
        }
        Ok(Self { document })
    }

    #[must_use]
    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }
}

fn missing(reason: &str) -> HostError {
    HostError::MissingRoot {
        reason: reason.to_owned(),
    }
}

fn unavailable(err: &JsValue) -> HostError {
    HostError::ObserverUnavailable {
        reason: err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

fn nodes(list: &NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

fn translate(record: &MutationRecord) -> Option<ChangeRecord<Node>> {
    let target = record.target()?;
    match record.type_().as_str() {
        "attributes" => Some(ChangeRecord::Attributes {
            target,
            attribute_name: record.attribute_name(),
        }),
        "childList" => Some(ChangeRecord::ChildList {
            target,
            added: nodes(&record.added_nodes()),
            removed: nodes(&record.removed_nodes()),
        }),
        _ => None,
    }
}

/// Live native observer plus the slot holding the lifecycle callback.
///
/// The JS function is owned by the JS heap; disconnecting empties the slot
/// so the dispatcher is released even if the browser still invokes the
/// function for an in-flight batch.
pub struct WebSubscription {
    observer: MutationObserver,
    slot: CallbackSlot,
    disconnected: Rc<Cell<bool>>,
}

impl fmt::Debug for WebSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSubscription")
            .field("disconnected", &self.disconnected.get())
            .finish_non_exhaustive()
    }
}

impl Host for WebHost {
    type Node = Node;
    type Subscription = WebSubscription;

    fn observed_root(&self) -> Result<Node, HostError> {
        self.document
            .body()
            .map(Node::from)
            .ok_or_else(|| missing("document has no body"))
    }

    fn elements_in(&self, root: &Node) -> Vec<Node> {
        let Some(element) = root.dyn_ref::<Element>() else {
            return Vec::new();
        };
        let mut elements = vec![root.clone()];
        match element.query_selector_all("*") {
            Ok(list) => elements.extend(nodes(&list)),
            Err(err) => tracing::warn!(message = "web.query_failed", error = ?err),
        }
        elements
    }

    fn class_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>().map(Element::class_name)
    }

    fn observe(
        &self,
        root: &Node,
        options: ObserverOptions,
        callback: ChangeCallback<Node>,
    ) -> Result<WebSubscription, HostError> {
        let slot: CallbackSlot = Rc::new(RefCell::new(Some(callback)));
        let disconnected = Rc::new(Cell::new(false));

        let function = {
            let slot = Rc::clone(&slot);
            let disconnected = Rc::clone(&disconnected);
            Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
                move |records: js_sys::Array, _observer: MutationObserver| {
                    // Taken out for the call so a handler may disconnect.
                    let Some(mut callback) = slot.borrow_mut().take() else {
                        return;
                    };
                    let batch: Vec<ChangeRecord<Node>> = records
                        .iter()
                        .filter_map(|value| value.dyn_into::<MutationRecord>().ok())
                        .filter_map(|record| translate(&record))
                        .collect();
                    let result = callback(batch);
                    if !disconnected.get() {
                        *slot.borrow_mut() = Some(callback);
                    }
                    if let Err(err) = result {
                        tracing::error!(message = "web.dispatch_failed", error = %err);
                        wasm_bindgen::throw_str(&err.to_string());
                    }
                },
            )
            .into_js_value()
        };

        let observer =
            MutationObserver::new(function.unchecked_ref()).map_err(|e| unavailable(&e))?;
        let init = MutationObserverInit::new();
        init.set_child_list(options.child_list);
        init.set_subtree(options.subtree);
        init.set_attributes(options.attributes);
        observer
            .observe_with_options(root, &init)
            .map_err(|e| unavailable(&e))?;

        Ok(WebSubscription {
            observer,
            slot,
            disconnected,
        })
    }

    fn disconnect(&self, subscription: WebSubscription) {
        subscription.disconnected.set(true);
        subscription.observer.disconnect();
        subscription.slot.borrow_mut().take();
    }
}

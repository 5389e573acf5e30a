#![no_main]

use domian_dom::{Document, DomError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };
    if markup.len() > 8192 {
        return;
    }

    let doc = Document::new();
    match doc.parse_fragment(markup) {
        Ok(nodes) => {
            for node in &nodes {
                assert!(node.parent_node().is_none(), "fragments start detached");
                let _ = node.text_content();
                let _ = node.descendant_elements();
            }
        }
        Err(DomError::Markup { offset, .. }) => {
            assert!(offset <= markup.len(), "error offset within input");
        }
        Err(other) => panic!("unexpected error kind: {other}"),
    }

    // innerHTML goes through the same parser and must not panic either.
    let body = doc.body();
    if body.set_inner_html(markup).is_ok() {
        let _ = body.children();
    }
});

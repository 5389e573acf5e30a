//! Markup fragment parser for `set_inner_html` and fixtures.
//!
//! Deliberately small: elements, attributes, text, comments, and void
//! elements. It is lenient where HTML is lenient (stray closing tags are
//! dropped, open elements are closed at end of input) and strict only where
//! the input cannot be tokenised at all.

use crate::error::DomError;

/// Parsed fragment node, independent of any document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Fragment>,
    },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Fragment>,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    roots: Vec<Fragment>,
    stack: Vec<OpenElement>,
    text: String,
}

/// Parse a markup fragment into top-level nodes.
pub(crate) fn parse(input: &str) -> Result<Vec<Fragment>, DomError> {
    let mut parser = Parser {
        input,
        pos: 0,
        roots: Vec::new(),
        stack: Vec::new(),
        text: String::new(),
    };
    parser.run()?;
    Ok(parser.roots)
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), DomError> {
        let input = self.input;
        while self.pos < input.len() {
            let rest = &input[self.pos..];
            if rest.starts_with("<!--") {
                self.flush_text();
                self.skip_comment()?;
            } else if rest.starts_with("</") {
                self.flush_text();
                self.closing_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.flush_text();
                self.opening_tag()?;
            } else {
                let first = rest.chars().next().map_or(1, char::len_utf8);
                let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
                self.text.push_str(&rest[..end]);
                self.pos += end;
            }
        }
        self.flush_text();
        while let Some(open) = self.stack.pop() {
            self.push_node(Fragment::Element {
                tag: open.tag,
                attributes: open.attributes,
                children: open.children,
            });
        }
        Ok(())
    }

    fn push_node(&mut self, node: Fragment) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.text);
        self.push_node(Fragment::Text(decode_entities(&raw)));
    }

    fn skip_comment(&mut self) -> Result<(), DomError> {
        let body = self.pos + 4;
        match self.input[body..].find("-->") {
            Some(end) => {
                self.pos = body + end + 3;
                Ok(())
            }
            None => Err(self.error(self.pos, "unterminated comment")),
        }
    }

    fn closing_tag(&mut self) -> Result<(), DomError> {
        let start = self.pos;
        let Some(end) = self.input[start..].find('>') else {
            return Err(self.error(start, "unterminated closing tag"));
        };
        let name = self.input[start + 2..start + end].trim().to_ascii_lowercase();
        self.pos = start + end + 1;

        // Close up to the nearest matching open element; a closing tag with
        // no open counterpart is dropped.
        if let Some(depth) = self.stack.iter().rposition(|open| open.tag == name) {
            while self.stack.len() > depth {
                let Some(open) = self.stack.pop() else { break };
                self.push_node(Fragment::Element {
                    tag: open.tag,
                    attributes: open.attributes,
                    children: open.children,
                });
            }
        }
        Ok(())
    }

    fn opening_tag(&mut self) -> Result<(), DomError> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let tag = tag.to_ascii_lowercase();
        let mut attributes: Vec<(String, String)> = Vec::new();
        let input = self.input;
        let self_closing = loop {
            self.skip_whitespace();
            let rest = &input[self.pos..];
            if rest.is_empty() {
                return Err(self.error(start, "unterminated tag"));
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self.pos = input.len() - after.len();
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let (name, value) = self.attribute(start)?;
            if !attributes.iter().any(|(existing, _)| *existing == name) {
                attributes.push((name, value));
            }
        };

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            self.push_node(Fragment::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
        } else {
            self.stack.push(OpenElement {
                tag,
                attributes,
                children: Vec::new(),
            });
        }
        Ok(())
    }

    fn attribute(&mut self, tag_start: usize) -> Result<(String, String), DomError> {
        let name = self
            .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
            .to_ascii_lowercase();
        self.skip_whitespace();
        let input = self.input;
        if !input[self.pos..].starts_with('=') {
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();
        let rest = &input[self.pos..];
        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let Some(end) = rest[1..].find(quote) else {
                    return Err(self.error(self.pos, "unterminated attribute value"));
                };
                let raw = &rest[1..end + 1];
                self.pos += end + 2;
                decode_entities(raw)
            }
            Some(_) => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                decode_entities(raw)
            }
            None => return Err(self.error(tag_start, "unterminated tag")),
        };
        Ok((name, value))
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let input: &'a str = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !accept(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn error(&self, offset: usize, reason: &'static str) -> DomError {
        DomError::Markup { offset, reason }
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
            ("&apos;", '\''),
        ]
        .into_iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match decoded {
            Some((entity, ch)) => {
                out.push(ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

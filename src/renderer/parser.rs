//! Tree builder - rendered markup to [`VNode`].
//!
//! A lenient HTML-like scanner. It never fails: malformed input produces the
//! best tree it can.
//!
//! - Attributes may be double-quoted, single-quoted, unquoted or bare
//! - Void elements and `<x/>` close immediately
//! - A mismatched end tag closes up to its nearest open match; a stray one is
//!   ignored
//! - Comments, doctype and processing instructions are skipped
//! - `script` and `style` content is kept verbatim
//! - Tag and attribute names are lowercased
//!
//! Only the first top-level element is returned. Sibling top-level elements
//! and top-level text are dropped.

use super::vnode::{Attributes, VNode};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Longest entity body (between `&` and `;`) we try to decode.
const MAX_ENTITY_LEN: usize = 10;

/// Parse markup into its first top-level element.
///
/// Returns `None` when the markup contains no element at all.
pub fn parse(markup: &str) -> Option<VNode> {
    let mut scanner = Scanner::new(markup);
    let mut builder = TreeBuilder::default();

    while let Some(token) = scanner.next_token() {
        match token {
            Token::Text(raw) => builder.text(decode_entities(raw)),
            Token::Start {
                tag,
                attrs,
                self_closing,
            } => {
                let is_void = self_closing || VOID_ELEMENTS.contains(&tag.as_str());
                let is_raw = !is_void && RAW_TEXT_ELEMENTS.contains(&tag.as_str());
                builder.open(tag.clone(), attrs);
                if is_void {
                    builder.close(&tag);
                } else if is_raw {
                    let content = scanner.raw_text(&tag);
                    builder.text(content.to_string());
                    builder.close(&tag);
                }
            }
            Token::End(tag) => builder.close(&tag),
        }
    }

    builder.finish()
}

// =============================================================================
// Scanner
// =============================================================================

enum Token<'a> {
    Text(&'a str),
    Start {
        tag: String,
        attrs: Attributes,
        self_closing: bool,
    },
    End(String),
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Move past the next occurrence of `pat`, or to the end.
    fn skip_past(&mut self, pat: &str) {
        match self.rest().find(pat) {
            Some(i) => self.pos += i + pat.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }

            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let name = self.take_while(is_name_char).to_ascii_lowercase();
                self.skip_past(">");
                if name.is_empty() {
                    continue;
                }
                return Some(Token::End(name));
            }
            if starts_tag(rest) {
                self.pos += 1;
                return Some(self.start_tag());
            }

            return Some(Token::Text(self.text_run()));
        }
    }

    fn text_run(&mut self) -> &'a str {
        let rest = self.rest();
        let mut search_from = 0;
        let end = loop {
            match rest[search_from..].find('<') {
                Some(i) => {
                    let at = search_from + i;
                    let tail = &rest[at..];
                    if at > 0 && opens_markup(tail) {
                        break at;
                    }
                    search_from = at + 1;
                }
                None => break rest.len(),
            }
        };
        self.pos += end;
        &rest[..end]
    }

    fn start_tag(&mut self) -> Token<'a> {
        let tag = self.take_while(is_name_char).to_ascii_lowercase();
        let mut attrs = Attributes::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let name = self
                        .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
                        .to_ascii_lowercase();
                    if name.is_empty() {
                        self.bump();
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_whitespace();
                        decode_entities(self.attribute_value())
                    } else {
                        String::new()
                    };
                    attrs.entry(name).or_insert(value);
                }
            }
        }

        Token::Start {
            tag,
            attrs,
            self_closing,
        }
    }

    fn attribute_value(&mut self) -> &'a str {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let rest = self.rest();
                let end = rest.find(quote).unwrap_or(rest.len());
                self.pos += end;
                self.bump();
                &rest[..end]
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        }
    }

    /// Content of a raw-text element up to its end tag, which is consumed.
    fn raw_text(&mut self, tag: &str) -> &'a str {
        let rest = self.rest();
        // ASCII lowercasing keeps byte offsets intact
        let lower = rest.to_ascii_lowercase();
        let end = lower.find(&format!("</{tag}")).unwrap_or(rest.len());
        self.pos += end;
        self.skip_past(">");
        &rest[..end]
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn starts_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn opens_markup(s: &str) -> bool {
    starts_tag(s) || s.starts_with("</") || s.starts_with("<!") || s.starts_with("<?")
}

// =============================================================================
// Tree Builder
// =============================================================================

struct OpenElement {
    tag: String,
    attrs: Attributes,
    children: Vec<VNode>,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<OpenElement>,
    roots: Vec<VNode>,
}

impl TreeBuilder {
    fn push(&mut self, node: VNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn text(&mut self, content: String) {
        if !content.is_empty() {
            self.push(VNode::Text(content));
        }
    }

    fn open(&mut self, tag: String, attrs: Attributes) {
        self.stack.push(OpenElement {
            tag,
            attrs,
            children: Vec::new(),
        });
    }

    fn close(&mut self, tag: &str) {
        let Some(index) = self.stack.iter().rposition(|open| open.tag == tag) else {
            return;
        };
        while self.stack.len() > index {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.push(VNode::Element {
                tag: open.tag,
                attrs: open.attrs,
                children: open.children,
            });
        }
    }

    fn finish(mut self) -> Option<VNode> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.roots.into_iter().find(|node| !node.is_text())
    }
}

// =============================================================================
// Entities
// =============================================================================

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN + 1)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = body.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

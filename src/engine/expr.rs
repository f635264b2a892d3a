//! Expression micro-language.
//!
//! Expressions are identifiers and dotted paths only: `user`, `user.name`,
//! `items.0.title`. Numeric segments index arrays. There are no operators and
//! no calls; anything else fails to resolve.
//!
//! Template interpolation replaces each `{{ expr }}` with whatever the caller's
//! resolver returns for the trimmed expression, or leaves the trimmed
//! expression text in place when nothing resolves.

use crate::types::{display_value, Props, Value};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<'a> {
    segments: Vec<&'a str>,
}

impl<'a> Path<'a> {
    /// Parse a path. Returns `None` for anything that is not a dotted path.
    pub fn parse(expr: &'a str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }
        let segments: Vec<&str> = expr.split('.').collect();
        if !segments.iter().all(|s| is_segment(s)) {
            return None;
        }
        if segments[0].chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self { segments })
    }

    /// First segment, the name looked up in a scope.
    pub fn head(&self) -> &'a str {
        self.segments[0]
    }

    /// Segments after the head.
    pub fn tail(&self) -> &[&'a str] {
        &self.segments[1..]
    }

    /// Resolve against scopes searched in order.
    pub fn resolve(&self, scopes: &[&Props]) -> Option<Value> {
        scopes
            .iter()
            .find_map(|scope| scope.get(self.head()))
            .and_then(|root| walk(root, self.tail()))
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
}

/// Follow `segments` into a value.
pub fn walk(root: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Resolve `expr` against scopes searched in order.
pub fn resolve(expr: &str, scopes: &[&Props]) -> Option<Value> {
    Path::parse(expr)?.resolve(scopes)
}

/// Replace every `{{ expr }}` in `template`.
///
/// `lookup` receives the trimmed expression; a `None` leaves the trimmed
/// expression text in the output. An unterminated `{{` is kept verbatim.
pub fn interpolate(template: &str, lookup: impl FnMut(&str) -> Option<Value>) -> String {
    splice(template, &[], false, lookup)
}

/// Interpolation for markup templates.
///
/// Resolved values are escaped by [`escape_markup`] so they cannot change
/// the structure of the markup. Placeholders whose path starts with one of
/// `keep` are left untouched, braces included.
pub fn interpolate_markup(
    template: &str,
    keep: &[&str],
    lookup: impl FnMut(&str) -> Option<Value>,
) -> String {
    splice(template, keep, true, lookup)
}

fn splice(
    template: &str,
    keep: &[&str],
    escape: bool,
    mut lookup: impl FnMut(&str) -> Option<Value>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else { break };
        let expr = after[..end].trim();
        out.push_str(&rest[..start]);

        let kept = Path::parse(expr).is_some_and(|path| keep.contains(&path.head()));
        if kept {
            out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]);
        } else {
            match lookup(expr) {
                Some(value) if escape => out.push_str(&escape_markup(&display_value(&value))),
                Some(value) => out.push_str(&display_value(&value)),
                None => out.push_str(expr),
            }
        }
        rest = &after[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Escape `&`, `<`, `>`, `"` and `'` as entities the parser decodes.
pub fn escape_markup(text: &str) -> String {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Item names bound by `{prefix}for="item in items"` attributes.
///
/// Values may be double-quoted, single-quoted or bare. Their placeholders
/// belong to the directive pass, not to interpolation.
pub fn loop_bindings<'a>(template: &'a str, prefix: &str) -> Vec<&'a str> {
    let marker = format!("{prefix}for=");

    let mut bindings = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(&marker) {
        let attached = rest[..start]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace());
        let after = &rest[start + marker.len()..];
        let (value, next) = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after[1..];
                let end = body.find(quote).unwrap_or(body.len());
                (&body[..end], &body[(end + 1).min(body.len())..])
            }
            _ => {
                let end = after
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };
        rest = next;
        if attached {
            continue;
        }
        if let Some((binding, _)) = value.split_once(" in ") {
            let binding = binding.trim();
            if Path::parse(binding).is_some_and(|p| p.tail().is_empty()) && !bindings.contains(&binding) {
                bindings.push(binding);
            }
        }
    }
    bindings
}

/// Interpolate placeholders that name `binding` or a path under it.
///
/// Other placeholders are left untouched, braces included, for a later pass.
pub fn substitute_binding(text: &str, binding: &str, item: &Value) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else { break };
        let raw = &after[..end];
        let whole = &rest[start..start + OPEN.len() + end + CLOSE.len()];
        out.push_str(&rest[..start]);

        let resolved = Path::parse(raw)
            .filter(|path| path.head() == binding)
            .and_then(|path| walk(item, path.tail()));
        match resolved {
            Some(value) => out.push_str(&display_value(&value)),
            None => out.push_str(whole),
        }
        rest = &after[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

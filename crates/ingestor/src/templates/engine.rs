//! `%(name)s` placeholder substitution.
//!
//! Rendering is validate-then-render: every placeholder of the template must
//! be bound before any text is produced, and substitution is a single pass,
//! so bound values are never scanned for placeholders themselves.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ingestor_protocol::{IngestError, IngestResult};
use regex::Regex;

const PLACEHOLDER_PATTERN: &str = r"%\((\w+)\)s";

/// Values for the placeholders of one template.
pub type Bindings = BTreeMap<&'static str, String>;

/// Static template text with named placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub text: &'static str,
}

impl Template {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> IngestResult<Vec<&'static str>> {
        let mut names: Vec<&'static str> = Vec::new();
        for caps in placeholder_pattern()?.captures_iter(self.text) {
            if let Some(name) = caps.get(1) {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        Ok(names)
    }

    pub fn render(&self, bindings: &Bindings) -> IngestResult<String> {
        let missing: Vec<&str> = self
            .placeholders()?
            .into_iter()
            .filter(|name| !bindings.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::template(format!(
                "template '{}' has unbound placeholder(s): {}",
                self.name,
                missing.join(", ")
            )));
        }

        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for caps in placeholder_pattern()?.captures_iter(self.text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&self.text[last..whole.start()]);
            if let Some(value) = bindings.get(name.as_str()) {
                out.push_str(value);
            }
            last = whole.end();
        }
        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

fn placeholder_pattern() -> IngestResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(PLACEHOLDER_PATTERN))
        .as_ref()
        .map_err(|e| IngestError::template(format!("invalid placeholder pattern: {}", e)))
}

/// True if `text` still contains a placeholder token.
pub fn has_placeholder(text: &str) -> bool {
    placeholder_pattern()
        .map(|pattern| pattern.is_match(text))
        .unwrap_or(false)
}

/// Double-quoted HOCON string body: backslash, quote and control
/// characters escaped.
pub fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// A HOCON value: bare when it only holds path-like characters, quoted
/// otherwise.
pub fn bare_or_quoted(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
    if bare {
        value.to_string()
    } else {
        format!("\"{}\"", quoted(value))
    }
}

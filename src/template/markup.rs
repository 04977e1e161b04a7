//! markup construction for the `html` binding
//!
//! templates build markup with a tagged template literal:
//!
//! ```text
//! ${html`<ha-icon icon="${state == 'on' ? 'mdi:lightbulb' : 'mdi:lightbulb-off'}"></ha-icon>`}
//! ```
//!
//! the host decides what markup is; the built-in [`HtmlMarkup`] renders
//! escaped HTML text.

use std::fmt;

use serde::Serialize;

use super::value::Value;

/// markup produced by the `html` template tag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    /// wrap already rendered markup
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// builds markup from the literal chunks and interpolated values of a tagged
/// template; `strings` always has one more element than `values`
pub trait MarkupBuilder {
    fn build(&self, strings: &[String], values: &[Value<'_>]) -> Markup;
}

/// default markup builder: literal chunks verbatim, interpolations escaped
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkup;

impl MarkupBuilder for HtmlMarkup {
    fn build(&self, strings: &[String], values: &[Value<'_>]) -> Markup {
        let mut out = String::new();

        for (i, chunk) in strings.iter().enumerate() {
            out.push_str(chunk);
            if let Some(value) = values.get(i) {
                push_value(&mut out, value);
            }
        }

        Markup(out)
    }
}

fn push_value(out: &mut String, value: &Value<'_>) {
    match value {
        Value::Undefined | Value::Null => {}
        Value::Markup(markup) => out.push_str(markup.as_str()),
        Value::Array(items) => items.iter().for_each(|item| push_value(out, item)),
        Value::JsonArray(items) => items
            .iter()
            .for_each(|item| push_value(out, &Value::from_json(item))),
        other => push_escaped(out, &other.to_string()),
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

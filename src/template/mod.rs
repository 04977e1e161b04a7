//! template evaluation for card configuration values
//!
//! a configuration string is a template when, ignoring surrounding
//! whitespace, it is wrapped in `${` and `}`:
//!
//! ```text
//! ${state == 'on' ? 'mdi:lightbulb' : 'mdi:lightbulb-off'}
//! ${if (user.is_admin) return 'red'; return 'grey'}
//! ```
//!
//! the body is a small expression language evaluated with exactly four
//! bindings: `hass` (state snapshot), `state` (state of the current entity or
//! null), `user` (signed-in user or undefined) and `html` (markup tag).
//! anything that is not a template is returned unchanged.

mod error;
mod eval;
mod lexer;
mod markup;
mod parser;
mod types;
mod value;

use tracing::{debug, trace};

pub use error::{ErrorKind, ScriptError, TemplateError};
pub use eval::EvalContext;
pub use markup::{HtmlMarkup, Markup, MarkupBuilder};
pub use value::{compare, format_number, loose_eq, strict_eq, string_to_number, Value};

/// keyword that makes the implicit return unnecessary
const RETURN_KEYWORD: &str = "return";

/// whether `s` is a template (`${...}` after trimming)
pub fn is_template(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.starts_with("${") && trimmed.ends_with('}')
}

/// expression body of a template: delimiters removed, `return ` added when missing
pub fn expression_body(template: &str) -> Option<String> {
    if !is_template(template) {
        return None;
    }

    let trimmed = template.trim();
    let inner = &trimmed[2..trimmed.len() - 1];

    if inner.trim_start().to_lowercase().starts_with(RETURN_KEYWORD) {
        Some(inner.to_string())
    } else {
        Some(format!("{} {}", RETURN_KEYWORD, inner))
    }
}

/// check a template body for syntax errors without evaluating it
pub fn check_syntax(template: &str) -> Result<(), TemplateError> {
    match expression_body(template) {
        Some(body) => parser::parse_program(&body)
            .map(|_| ())
            .map_err(|cause| TemplateError::new(cause, &body)),
        None => Ok(()),
    }
}

/// evaluate a template for an entity
///
/// non-templates are returned unchanged as strings. when `entity` is given it
/// must exist in the snapshot, and its state is bound to `state`.
pub fn evaluate<'a>(
    entity: Option<&str>,
    template: &str,
    ctx: &EvalContext<'a>,
) -> Result<Value<'a>, TemplateError> {
    let Some(body) = expression_body(template) else {
        return Ok(Value::String(template.to_string()));
    };

    trace!(entity = ?entity, body = %body, "evaluating template");

    let result = parser::parse_program(&body).and_then(|program| {
        let state = bind_state(entity, ctx)?;
        eval::run(&program, state, ctx)
    });

    result.map_err(|cause| {
        debug!(entity = ?entity, error = %cause, "template evaluation failed");
        TemplateError::new(cause, &body)
    })
}

/// value of the `state` binding
fn bind_state<'a>(entity: Option<&str>, ctx: &EvalContext<'a>) -> Result<Value<'a>, ScriptError> {
    let Some(entity_id) = entity else {
        return Ok(Value::Null);
    };

    match ctx.hass().state(entity_id) {
        Some(entity) => Ok(Value::String(entity.state.clone())),
        None => {
            let suggestions = ctx.hass().suggest_entities(entity_id);
            Err(ScriptError::entity_not_found(entity_id, &suggestions))
        }
    }
}

//! rule matcher
//!
//! selects the rule whose condition holds for the current value of an entity

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use super::types::{ConditionalRule, RuleOperator};
use crate::template::{self, compare, loose_eq, EvalContext, TemplateError, Value};

/// a rule condition could not be evaluated
///
/// the whole match fails; a broken rule is never treated as non-matching.
#[derive(Debug, Error)]
pub enum RuleMatchError {
    #[error("rule {index}: invalid regex '{pattern}': {source}")]
    InvalidRegex {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule {index}: {source}")]
    Template {
        index: usize,
        #[source]
        source: TemplateError,
    },
    #[error("rule {index}: operator 'template' expects a template string, got {value}")]
    TemplateValue { index: usize, value: String },
}

impl RuleMatchError {
    /// position of the failing rule in the list
    pub fn index(&self) -> usize {
        match self {
            RuleMatchError::InvalidRegex { index, .. }
            | RuleMatchError::Template { index, .. }
            | RuleMatchError::TemplateValue { index, .. } => *index,
        }
    }
}

/// find the rule that applies to `current`
///
/// returns the first rule (in list order) whose operator holds; when none
/// holds, the last `default` rule; otherwise `None`. every rule is checked,
/// so a broken rule fails the match even after an earlier rule matched.
pub fn match_rules<'r>(
    entity: Option<&str>,
    rules: &'r [ConditionalRule],
    current: &Value<'_>,
    ctx: &EvalContext<'_>,
) -> Result<Option<&'r ConditionalRule>, RuleMatchError> {
    let mut matched = None;
    let mut fallback = None;

    for (index, rule) in rules.iter().enumerate() {
        let operator = rule.operator();

        if operator == RuleOperator::Default {
            fallback = Some(rule);
            continue;
        }

        let holds = rule_holds(index, &operator, rule, entity, current, ctx)?;
        trace!(index, operator = %operator, holds, "checked rule");

        if holds && matched.is_none() {
            matched = Some(rule);
        }
    }

    Ok(matched.or(fallback))
}

fn rule_holds(
    index: usize,
    operator: &RuleOperator,
    rule: &ConditionalRule,
    entity: Option<&str>,
    current: &Value<'_>,
    ctx: &EvalContext<'_>,
) -> Result<bool, RuleMatchError> {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let expected = Value::from_json(&rule.value);

    let holds = match operator {
        RuleOperator::Lt => compare(current, &expected) == Some(Less),
        RuleOperator::Le => matches!(compare(current, &expected), Some(Less | Equal)),
        RuleOperator::Eq => loose_eq(current, &expected),
        RuleOperator::Ge => matches!(compare(current, &expected), Some(Greater | Equal)),
        RuleOperator::Gt => compare(current, &expected) == Some(Greater),
        RuleOperator::Ne => !loose_eq(current, &expected),
        RuleOperator::Regex => {
            let pattern = expected.to_string();
            let regex = Regex::new(&pattern).map_err(move |source| RuleMatchError::InvalidRegex {
                index,
                pattern,
                source,
            })?;
            regex.is_match(&current.to_string())
        }
        RuleOperator::Template => {
            let Some(body) = rule.value.as_str() else {
                return Err(RuleMatchError::TemplateValue {
                    index,
                    value: rule.value.to_string(),
                });
            };
            let result = template::evaluate(entity, body, ctx)
                .map_err(|source| RuleMatchError::Template { index, source })?;
            loose_eq(&result, &Value::Bool(true))
        }
        RuleOperator::Default => false,
        RuleOperator::Unknown(op) => {
            debug!(index, operator = %op, "unknown rule operator never matches");
            false
        }
    };

    Ok(holds)
}

//! conditional rule configuration

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// one entry of an entity's `state` list
///
/// only `value` and `operator` take part in matching; `icon`, `color` and
/// `hide` are applied by the card when the rule is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    /// value compared against the current value, or a template for `template`
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// boolean or template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<JsonValue>,
}

impl ConditionalRule {
    /// rule with the implicit `==` operator
    pub fn new(value: JsonValue) -> Self {
        Self {
            value,
            operator: None,
            icon: None,
            color: None,
            hide: None,
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_hide(mut self, hide: JsonValue) -> Self {
        self.hide = Some(hide);
        self
    }

    /// normalized operator of this rule
    pub fn operator(&self) -> RuleOperator {
        RuleOperator::parse(self.operator.as_deref())
    }
}

/// comparison operators supported in rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOperator {
    /// less than: <
    Lt,
    /// less than or equal: <=
    Le,
    /// loose equality: == (also used when the operator is missing)
    Eq,
    /// greater than or equal: >=
    Ge,
    /// greater than: >
    Gt,
    /// loose inequality: !=
    Ne,
    /// the current value as a string contains a match of the pattern
    Regex,
    /// the rule value is a template that must evaluate to true
    Template,
    /// fallback when nothing else matches
    Default,
    /// anything else; never matches
    Unknown(String),
}

impl RuleOperator {
    /// parse an operator, ignoring case and surrounding whitespace
    pub fn parse(operator: Option<&str>) -> Self {
        let normalized = operator.map(|op| op.trim().to_lowercase()).unwrap_or_default();

        match normalized.as_str() {
            "" | "==" => RuleOperator::Eq,
            "<" => RuleOperator::Lt,
            "<=" => RuleOperator::Le,
            ">=" => RuleOperator::Ge,
            ">" => RuleOperator::Gt,
            "!=" => RuleOperator::Ne,
            "regex" => RuleOperator::Regex,
            "template" => RuleOperator::Template,
            "default" => RuleOperator::Default,
            _ => RuleOperator::Unknown(normalized),
        }
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOperator::Lt => write!(f, "<"),
            RuleOperator::Le => write!(f, "<="),
            RuleOperator::Eq => write!(f, "=="),
            RuleOperator::Ge => write!(f, ">="),
            RuleOperator::Gt => write!(f, ">"),
            RuleOperator::Ne => write!(f, "!="),
            RuleOperator::Regex => write!(f, "regex"),
            RuleOperator::Template => write!(f, "template"),
            RuleOperator::Default => write!(f, "default"),
            RuleOperator::Unknown(op) => write!(f, "{}", op),
        }
    }
}

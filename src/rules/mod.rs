//! conditional rules for entity display attributes
//!
//! an entity can carry a list of rules under `state`; the first rule whose
//! operator holds against the current value decides its icon, color and
//! visibility:
//!
//! ```json5
//! state: [
//!   { value: 20, operator: "<", color: "blue" },
//!   { value: "${user.name == 'guest'}", operator: "template", hide: true },
//!   { value: 0, operator: "default", color: "grey" },
//! ]
//! ```
//!
//! operators: `<`, `<=`, `==` (default), `>=`, `>`, `!=`, `regex`,
//! `template`, `default`. comparisons use loose equality so numeric and
//! string config values compare the way users expect.

mod matcher;
mod types;

pub use matcher::{match_rules, RuleMatchError};
pub use types::{ConditionalRule, RuleOperator};

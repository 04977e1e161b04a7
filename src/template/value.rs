//! dynamic values of the expression language and their coercion rules
//!
//! conversions follow the loose typing users expect from browser templates:
//!
//! | from \ to  | number                | string                  | boolean        |
//! |------------|-----------------------|-------------------------|----------------|
//! | undefined  | NaN                   | "undefined"             | false          |
//! | null       | 0                     | "null"                  | false          |
//! | boolean    | 1 / 0                 | "true" / "false"        | itself         |
//! | string     | numeric literal, else NaN ("" is 0) | itself    | non-empty      |
//! | array      | via its string        | items joined with ","   | true           |
//! | object     | NaN                   | "[object Object]"       | true           |
//!
//! snapshot data is borrowed, never copied: `hass.states['light.a']` is a view
//! of the entity record owned by the caller.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value as Json};

use super::error::ScriptError;
use super::markup::Markup;
use crate::hass::{EntityState, Hass, StateStore};

/// a value produced or consumed by an expression
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value<'a> {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// array built by the expression itself
    Array(Vec<Value<'a>>),
    /// array inside the snapshot or the user identity
    JsonArray(&'a [Json]),
    /// object inside the snapshot or the user identity
    Object(&'a Map<String, Json>),
    Hass(&'a Hass),
    States(&'a StateStore),
    Entity(&'a EntityState),
    Markup(Markup),
    /// the `html` template tag
    MarkupHelper,
}

impl<'a> Value<'a> {
    /// view a JSON value; scalars are copied, containers borrowed
    pub fn from_json(json: &'a Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::JsonArray(items),
            Json::Object(map) => Value::Object(map),
        }
    }

    /// serialize for output; non-finite numbers and undefined become null
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null | Value::MarkupHelper => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::JsonArray(items) => Json::Array(items.to_vec()),
            Value::Object(map) => Json::Object((*map).clone()),
            Value::Hass(hass) => serde_json::to_value(hass).unwrap_or(Json::Null),
            Value::States(states) => serde_json::to_value(states).unwrap_or(Json::Null),
            Value::Entity(entity) => serde_json::to_value(entity).unwrap_or(Json::Null),
            Value::Markup(markup) => Json::String(markup.to_string()),
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// name reported by `typeof`
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::MarkupHelper => "function",
            _ => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// primitive form of a value; objects convert through their string form
    pub fn to_primitive(&self) -> Value<'a> {
        if self.is_primitive() {
            self.clone()
        } else {
            Value::String(self.to_string())
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) | Value::JsonArray(_) => string_to_number(&self.to_string()),
            _ => f64::NAN,
        }
    }

    // ------------------------------------------------------------------------
    // member access
    // ------------------------------------------------------------------------

    /// read a property; reading from null or undefined is a TypeError
    pub fn get_member(&self, key: &Value<'a>) -> Result<Value<'a>, ScriptError> {
        let name = key.to_string();

        let value = match self {
            Value::Undefined | Value::Null => {
                return Err(ScriptError::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    self, name
                )));
            }
            Value::String(s) => match (name.as_str(), array_index(key)) {
                ("length", _) => Value::Number(s.encode_utf16().count() as f64),
                (_, Some(i)) => s
                    .chars()
                    .nth(i)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or_default(),
                _ => Value::Undefined,
            },
            Value::Array(items) => match (name.as_str(), array_index(key)) {
                ("length", _) => Value::Number(items.len() as f64),
                (_, Some(i)) => items.get(i).cloned().unwrap_or_default(),
                _ => Value::Undefined,
            },
            Value::JsonArray(items) => match (name.as_str(), array_index(key)) {
                ("length", _) => Value::Number(items.len() as f64),
                (_, Some(i)) => items.get(i).map(Value::from_json).unwrap_or_default(),
                _ => Value::Undefined,
            },
            Value::Object(map) => map.get(&name).map(Value::from_json).unwrap_or_default(),
            Value::Hass(hass) => match name.as_str() {
                "states" => Value::States(&hass.states),
                "user" => hass.user.as_ref().map(Value::from_json).unwrap_or_default(),
                _ => hass.extra.get(&name).map(Value::from_json).unwrap_or_default(),
            },
            Value::States(states) => states.get(&name).map(Value::Entity).unwrap_or_default(),
            Value::Entity(entity) => entity_member(entity, &name),
            _ => Value::Undefined,
        };

        Ok(value)
    }

    /// call a built-in method; `None` when the value has no such method
    pub fn call_method(
        &self,
        name: &str,
        args: &[Value<'a>],
    ) -> Option<Result<Value<'a>, ScriptError>> {
        match self {
            Value::String(s) => string_method(s, name, args),
            Value::Number(n) => number_method(*n, name, args),
            Value::Bool(_) if name == "toString" => Some(Ok(Value::String(self.to_string()))),
            Value::Array(items) => array_method(items, name, args),
            Value::JsonArray(items) => {
                let items: Vec<Value<'a>> = items.iter().map(Value::from_json).collect();
                array_method(&items, name, args)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value<'_> {
    /// string conversion of the value
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => f.write_str(&join(items, ",")),
            Value::JsonArray(items) => {
                let items: Vec<Value<'_>> = items.iter().map(Value::from_json).collect();
                f.write_str(&join(&items, ","))
            }
            Value::Markup(markup) => write!(f, "{}", markup),
            Value::MarkupHelper => f.write_str("function html() { [native code] }"),
            Value::Object(_) | Value::Hass(_) | Value::States(_) | Value::Entity(_) => {
                f.write_str("[object Object]")
            }
        }
    }
}

fn entity_member<'a>(entity: &'a EntityState, name: &str) -> Value<'a> {
    let timestamp = |t: &Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| Value::String(t.to_rfc3339())).unwrap_or_default()
    };

    match name {
        "entity_id" => Value::String(entity.entity_id.clone()),
        "state" => Value::String(entity.state.clone()),
        "attributes" => Value::Object(&entity.attributes),
        "last_changed" => timestamp(&entity.last_changed),
        "last_updated" => timestamp(&entity.last_updated),
        _ => Value::Undefined,
    }
}

/// canonical non-negative integer index ("0", "12", but not "01" or "1.5")
fn array_index(key: &Value<'_>) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < usize::MAX as f64 => {
            Some(*n as usize)
        }
        Value::String(s) => {
            let i: usize = s.parse().ok()?;
            (i.to_string() == *s).then_some(i)
        }
        _ => None,
    }
}

fn number_to_json(n: f64) -> Json {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Json::Number)
            .unwrap_or(Json::Null)
    }
}

// ----------------------------------------------------------------------------
// coercion
// ----------------------------------------------------------------------------

/// string to number conversion: whitespace is ignored, "" is 0, hex is
/// accepted, anything that is not a complete numeric literal is NaN
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    if unsigned == "Infinity" {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    if !is_decimal_literal(unsigned) {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// digits with an optional fraction and exponent, at least one mantissa digit
fn is_decimal_literal(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };

    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !digits.is_empty() && all_digits(digits)
        }
    }
}

/// number to string conversion: integers print without a fraction, very
/// large and very small magnitudes use exponent notation
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", n);
    }

    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => formatted,
    }
}

/// loose equality (`==`)
pub fn loose_eq(a: &Value<'_>, b: &Value<'_>) -> bool {
    if a.is_nullish() || b.is_nullish() {
        return a.is_nullish() && b.is_nullish();
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::String(_)) => *x == b.to_number(),
        (Value::String(_), Value::Number(y)) => a.to_number() == *y,
        (Value::Bool(_), _) => loose_eq(&Value::Number(a.to_number()), b),
        (_, Value::Bool(_)) => loose_eq(a, &Value::Number(b.to_number())),
        _ if a.is_primitive() && !b.is_primitive() => loose_eq(a, &b.to_primitive()),
        _ if !a.is_primitive() && b.is_primitive() => loose_eq(&a.to_primitive(), b),
        _ => strict_eq(a, b),
    }
}

/// strict equality (`===`); objects are equal only when they are the same object
pub fn strict_eq(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::JsonArray(x), Value::JsonArray(y)) => std::ptr::eq(*x, *y),
        (Value::Object(x), Value::Object(y)) => std::ptr::eq(*x, *y),
        (Value::Hass(x), Value::Hass(y)) => std::ptr::eq(*x, *y),
        (Value::States(x), Value::States(y)) => std::ptr::eq(*x, *y),
        (Value::Entity(x), Value::Entity(y)) => std::ptr::eq(*x, *y),
        (Value::MarkupHelper, Value::MarkupHelper) => true,
        _ => false,
    }
}

/// strict equality where NaN equals NaN (used by `includes`)
fn same_value_zero(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_eq(a, b),
    }
}

/// relational comparison: two strings compare by UTF-16 code units, anything
/// else numerically; `None` when either side is NaN
pub fn compare(a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (a.to_primitive(), b.to_primitive()) {
        (Value::String(x), Value::String(y)) => Some(x.encode_utf16().cmp(y.encode_utf16())),
        (x, y) => x.to_number().partial_cmp(&y.to_number()),
    }
}

/// `+`: string concatenation when either primitive side is a string
pub fn add<'a>(a: &Value<'_>, b: &Value<'_>) -> Value<'a> {
    match (a.to_primitive(), b.to_primitive()) {
        (x @ Value::String(_), y) | (x, y @ Value::String(_)) => {
            Value::String(format!("{}{}", x, y))
        }
        (x, y) => Value::Number(x.to_number() + y.to_number()),
    }
}

fn join(items: &[Value<'_>], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

// ----------------------------------------------------------------------------
// built-in methods
// ----------------------------------------------------------------------------

fn arg<'v, 'a>(args: &'v [Value<'a>], i: usize) -> &'v Value<'a> {
    const UNDEFINED: &Value<'static> = &Value::Undefined;
    args.get(i).unwrap_or(UNDEFINED)
}

/// integer argument, `default` when missing or undefined
fn int_arg(args: &[Value<'_>], i: usize, default: f64) -> f64 {
    match arg(args, i) {
        Value::Undefined => default,
        value => {
            let n = value.to_number();
            if n.is_nan() {
                0.0
            } else {
                n.trunc()
            }
        }
    }
}

/// resolve a possibly negative position against a length
fn relative_index(n: f64, len: usize) -> usize {
    let len_f = len as f64;
    let resolved = if n < 0.0 { (len_f + n).max(0.0) } else { n.min(len_f) };
    resolved as usize
}

fn char_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

fn string_method<'a>(
    s: &str,
    name: &str,
    args: &[Value<'a>],
) -> Option<Result<Value<'a>, ScriptError>> {
    let len = s.chars().count();
    let text = |v: String| Some(Ok(Value::String(v)));

    match name {
        "toLowerCase" | "toLocaleLowerCase" => text(s.to_lowercase()),
        "toUpperCase" | "toLocaleUpperCase" => text(s.to_uppercase()),
        "trim" => text(s.trim().to_string()),
        "toString" => text(s.to_string()),
        "startsWith" => {
            let search = arg(args, 0).to_string();
            let from = relative_index(int_arg(args, 1, 0.0).max(0.0), len);
            Some(Ok(Value::Bool(s[char_offset(s, from)..].starts_with(&search))))
        }
        "endsWith" => {
            let search = arg(args, 0).to_string();
            let end = relative_index(int_arg(args, 1, len as f64).max(0.0), len);
            Some(Ok(Value::Bool(s[..char_offset(s, end)].ends_with(&search))))
        }
        "includes" => {
            let search = arg(args, 0).to_string();
            let from = relative_index(int_arg(args, 1, 0.0).max(0.0), len);
            Some(Ok(Value::Bool(s[char_offset(s, from)..].contains(&search))))
        }
        "indexOf" => {
            let search = arg(args, 0).to_string();
            let from = relative_index(int_arg(args, 1, 0.0).max(0.0), len);
            let start = char_offset(s, from);
            let index = s[start..]
                .find(&search)
                .map(|i| (s[..start + i].chars().count()) as f64)
                .unwrap_or(-1.0);
            Some(Ok(Value::Number(index)))
        }
        "slice" => {
            let start = relative_index(int_arg(args, 0, 0.0), len);
            let end = relative_index(int_arg(args, 1, len as f64), len);
            let sliced = if start < end {
                s.chars().skip(start).take(end - start).collect()
            } else {
                String::new()
            };
            text(sliced)
        }
        "split" => {
            let limit = match arg(args, 1) {
                Value::Undefined => usize::MAX,
                value => value.to_number().max(0.0) as usize,
            };
            let parts: Vec<Value<'a>> = match arg(args, 0) {
                Value::Undefined => vec![Value::String(s.to_string())],
                separator => {
                    let separator = separator.to_string();
                    if separator.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    }
                }
            };
            Some(Ok(Value::Array(parts.into_iter().take(limit).collect())))
        }
        "replace" => {
            let pattern = arg(args, 0).to_string();
            let replacement = arg(args, 1).to_string();
            text(s.replacen(&pattern, &replacement, 1))
        }
        _ => None,
    }
}

fn number_method<'a>(
    n: f64,
    name: &str,
    args: &[Value<'a>],
) -> Option<Result<Value<'a>, ScriptError>> {
    match name {
        "toFixed" => {
            let digits = int_arg(args, 0, 0.0);
            if !(0.0..=100.0).contains(&digits) {
                return Some(Err(ScriptError::range(
                    "toFixed() digits argument must be between 0 and 100",
                )));
            }
            let fixed = if !n.is_finite() || n.abs() >= 1e21 {
                format_number(n)
            } else {
                to_fixed(n, digits as usize)
            };
            Some(Ok(Value::String(fixed)))
        }
        "toString" => {
            let radix = int_arg(args, 0, 10.0);
            if !(2.0..=36.0).contains(&radix) {
                return Some(Err(ScriptError::range(
                    "toString() radix must be between 2 and 36",
                )));
            }
            let formatted = if radix == 10.0 || !n.is_finite() {
                format_number(n)
            } else {
                format_radix(n, radix as u32)
            };
            Some(Ok(Value::String(formatted)))
        }
        _ => None,
    }
}

/// fixed-point notation; exact halfway values round away from zero
fn to_fixed(n: f64, digits: usize) -> String {
    // enough digits for the exact decimal expansion of any f64
    const EXACT_DIGITS: usize = 1100;

    let magnitude = n.abs();
    let exact = format!("{:.*}", EXACT_DIGITS, magnitude);
    let tie = exact
        .split_once('.')
        .map(|(_, frac)| {
            let rest = &frac[digits..];
            rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0')
        })
        .unwrap_or(false);

    let rounded = if tie {
        f64::from_bits(magnitude.to_bits() + 1)
    } else {
        magnitude
    };

    let fixed = format!("{:.*}", digits, rounded);
    if n < 0.0 {
        format!("-{}", fixed)
    } else {
        fixed
    }
}

/// number in a non-decimal radix, fraction digits included
fn format_radix(n: f64, radix: u32) -> String {
    const MAX_FRACTION_DIGITS: usize = 52;

    let digit = |d: u32| std::char::from_digit(d, radix).unwrap_or('0');
    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }

    let magnitude = n.abs();
    let mut int = magnitude.trunc();
    let mut int_digits = Vec::new();
    loop {
        int_digits.push(digit((int % radix as f64) as u32));
        int = (int / radix as f64).trunc();
        if int < 1.0 {
            break;
        }
    }
    out.extend(int_digits.iter().rev());

    let mut frac = magnitude.fract();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..MAX_FRACTION_DIGITS {
            frac *= radix as f64;
            out.push(digit(frac.trunc() as u32));
            frac = frac.fract();
            if frac == 0.0 {
                break;
            }
        }
    }

    out
}

fn array_method<'a>(
    items: &[Value<'a>],
    name: &str,
    args: &[Value<'a>],
) -> Option<Result<Value<'a>, ScriptError>> {
    let needle = arg(args, 0);

    match name {
        "includes" => Some(Ok(Value::Bool(
            items.iter().any(|item| same_value_zero(item, needle)),
        ))),
        "indexOf" => {
            let index = items
                .iter()
                .position(|item| strict_eq(item, needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            Some(Ok(Value::Number(index)))
        }
        "join" => {
            let separator = match needle {
                Value::Undefined => ",".to_string(),
                separator => separator.to_string(),
            };
            Some(Ok(Value::String(join(items, &separator))))
        }
        "toString" => Some(Ok(Value::String(join(items, ",")))),
        _ => None,
    }
}

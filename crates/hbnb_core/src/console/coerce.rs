//! Value-token coercion for `create` and `update`.
//!
//! # Invariants
//! - Only digits (optionally signed) → integer.
//! - Decimal-number pattern → float.
//! - Double-quoted → text, `\"` unescaped and `_` turned into spaces.
//! - Anything else → text verbatim.
//! - A token that matches a numeric pattern but does not fit the numeric
//!   type yields `None`; callers drop that single pair.

use crate::model::value::AttrValue;
use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid integer regex"));
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+\.\d*|\.\d+)$").expect("valid float regex"));
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)^"(.*)"$"#).expect("valid quoted regex"));

/// Coerces one raw value token.
pub fn coerce_token(raw: &str) -> Option<AttrValue> {
    if let Some(captures) = QUOTED_RE.captures(raw) {
        let inner = captures.get(1).map_or("", |inner| inner.as_str());
        return Some(AttrValue::Text(
            inner.replace("\\\"", "\"").replace('_', " "),
        ));
    }
    if INTEGER_RE.is_match(raw) {
        return raw.parse::<i64>().ok().map(AttrValue::Int);
    }
    if FLOAT_RE.is_match(raw) {
        return raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(AttrValue::Float);
    }
    Some(AttrValue::Text(raw.to_string()))
}

/// Splits `key=value` at the first `=`. Returns `None` without a key or `=`.
pub fn split_assignment(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

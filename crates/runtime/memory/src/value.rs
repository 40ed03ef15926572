//! Values as the server's script engine sees them.
//!
//! The engine has one number type and tables that cannot hold nil. Every
//! value entering a script goes through [`normalize`] so both runtimes work
//! on the same shape.

use serde_json::{Map, Number, Value};

/// Largest magnitude below which a whole float is exactly an integer.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// Brings a JSON value into the engine's shape.
///
/// - whole floats become integers
/// - arrays end at their first null
/// - object entries with a null value are dropped
/// - empty arrays become empty objects, since an empty table has no kind
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => {
            let items: Vec<Value> = items
                .into_iter()
                .take_while(|item| !item.is_null())
                .map(normalize)
                .collect();
            if items.is_empty() {
                Value::Object(Map::new())
            } else {
                Value::Array(items)
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

pub fn normalize_number(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT => {
            Number::from(f as i64)
        }
        _ => n,
    }
}

/// Formats a number like the engine's `tostring` (`%.14g`).
pub fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) => format_g14(f),
        None => n.to_string(),
    }
}

fn format_g14(f: f64) -> String {
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:.13e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    if !(-4..14).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (13 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, f)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt(value: Value) -> String {
        match value {
            Value::Number(n) => format_number(&n),
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(fmt(json!(3)), "3");
        assert_eq!(fmt(json!(3.0)), "3");
        assert_eq!(fmt(json!(-2.5)), "-2.5");
        assert_eq!(fmt(json!(0.1)), "0.1");
        assert_eq!(fmt(json!(1.0 / 3.0)), "0.33333333333333");
        assert_eq!(fmt(json!(100000000000000_i64)), "1e+14");
        assert_eq!(fmt(json!(12345678901234_i64)), "12345678901234");
        assert_eq!(fmt(json!(0.00001)), "1e-05");
        assert_eq!(fmt(json!(0.0001)), "0.0001");
        assert_eq!(fmt(json!(1.5e300)), "1.5e+300");
        assert_eq!(fmt(json!(0.0)), "0");
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(normalize(json!(3.0)), json!(3));
        assert!(normalize(json!(3.0)).is_i64());
        assert_eq!(normalize(json!(-2.0)), json!(-2));
        assert!(normalize(json!(2.5)).is_f64());
        assert_eq!(normalize(json!({"a": [1.0, "x"]})), json!({"a": [1, "x"]}));
    }

    #[test]
    fn test_normalize_nulls() {
        assert_eq!(normalize(json!([1, null, 2])), json!([1]));
        assert_eq!(normalize(json!({"a": null, "b": 1})), json!({"b": 1}));
        assert_eq!(normalize(json!([null, 1])), json!({}));
        assert_eq!(normalize(json!([])), json!({}));
        assert_eq!(normalize(json!({"a": [null]})), json!({"a": {}}));
        assert_eq!(normalize(Value::Null), Value::Null);
    }
}

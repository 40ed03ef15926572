//! Standard-library functions available to scripts.
//!
//! Each function reproduces what the server's script engine does for the
//! same call, so a script observes the same results in memory and on a
//! server. Functions are looked up by their dispatch name in a catalog that
//! is built once per process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use crate::{LogSink, StdoutSink, format_number, normalize, normalize_number};

/// Errors raised by builtin functions and their dispatcher.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid argument count for {name}: expected {expected}, got {got}")]
    InvalidArgCount {
        name: &'static str,
        expected: Argc,
        got: usize,
    },

    #[error("cjson.decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cannot convert to number: {0}")]
    Conversion(String),

    #[error("invalid argument for {name}: {message}")]
    InvalidArgument { name: &'static str, message: String },
}

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argc {
    pub count: usize,
    /// Inclusive upper bound. `None` means exactly `count`.
    pub at_most: Option<usize>,
}

impl Argc {
    pub const fn exact(count: usize) -> Self {
        Self {
            count,
            at_most: None,
        }
    }

    pub const fn range(count: usize, at_most: usize) -> Self {
        Self {
            count,
            at_most: Some(at_most),
        }
    }

    pub fn accepts(&self, got: usize) -> bool {
        match self.at_most {
            Some(at_most) => (self.count..=at_most).contains(&got),
            None => got == self.count,
        }
    }
}

impl fmt::Display for Argc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at_most {
            Some(at_most) => write!(f, "{} to {}", self.count, at_most),
            None => write!(f, "{}", self.count),
        }
    }
}

/// The closed set of builtin functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    StringFind,
    CJsonDecode,
    CJsonEncode,
    ToNumber,
    ToString,
    Type,
    RedisLog,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::StringFind,
        Builtin::CJsonDecode,
        Builtin::CJsonEncode,
        Builtin::ToNumber,
        Builtin::ToString,
        Builtin::Type,
        Builtin::RedisLog,
    ];

    /// The dispatch name scripts call the function by.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::StringFind => "string.find",
            Builtin::CJsonDecode => "cjson.decode",
            Builtin::CJsonEncode => "cjson.encode",
            Builtin::ToNumber => "tonumber",
            Builtin::ToString => "tostring",
            Builtin::Type => "type",
            Builtin::RedisLog => "redis.log",
        }
    }

    pub fn argc(self) -> Argc {
        match self {
            Builtin::StringFind => Argc::range(2, 3),
            Builtin::RedisLog => Argc::exact(2),
            Builtin::CJsonDecode
            | Builtin::CJsonEncode
            | Builtin::ToNumber
            | Builtin::ToString
            | Builtin::Type => Argc::exact(1),
        }
    }

    /// Looks up a function by dispatch name.
    pub fn lookup(name: &str) -> Option<Builtin> {
        static CATALOG: OnceLock<HashMap<&'static str, Builtin>> = OnceLock::new();
        CATALOG
            .get_or_init(|| Builtin::ALL.iter().map(|f| (f.name(), *f)).collect())
            .get(name)
            .copied()
    }

    /// Runs the function.
    ///
    /// The caller must have checked `args` against [`Builtin::argc`];
    /// [`Builtins::call`] does.
    pub fn call(self, args: &[Value], sink: &dyn LogSink) -> Result<Value, BuiltinError> {
        match self {
            Builtin::StringFind => string_find(&args[0], &args[1], args.get(2)),
            Builtin::CJsonDecode => Ok(normalize(serde_json::from_str(&to_text(&args[0]))?)),
            // The argument is stringified before encoding, so tables come out
            // as an encoded string of their text form. Non-ASCII text is
            // written as UTF-8 rather than as \u escapes.
            Builtin::CJsonEncode => Ok(Value::String(
                Value::String(to_text(&args[0])).to_string(),
            )),
            Builtin::ToNumber => to_number(&args[0]),
            Builtin::ToString => Ok(Value::String(to_text(&args[0]))),
            Builtin::Type => Ok(Value::String(type_name(&args[0]).to_string())),
            Builtin::RedisLog => {
                sink.write_line(&format!("{}: {}", to_text(&args[0]), to_text(&args[1])));
                Ok(Value::Null)
            }
        }
    }
}

/// Dispatches calls by name, checking arity first.
#[derive(Clone)]
pub struct Builtins {
    sink: Arc<dyn LogSink>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

impl Builtins {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let builtin =
            Builtin::lookup(name).ok_or_else(|| BuiltinError::UnknownFunction(name.to_string()))?;
        let argc = builtin.argc();
        if !argc.accepts(args.len()) {
            return Err(BuiltinError::InvalidArgCount {
                name: builtin.name(),
                expected: argc,
                got: args.len(),
            });
        }
        debug!(function = name, args = args.len(), "calling builtin");
        builtin.call(args, self.sink.as_ref())
    }
}

/// The type name the script engine reports for a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "table",
    }
}

/// The text form of a value, as produced by `tostring`.
///
/// Tables have no natural text form in the script engine. They are written
/// as compact JSON with sorted keys so the result is stable.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => canonical_json(value),
    }
}

/// Compact JSON with object keys in sorted order, of the value's
/// [`normalize`]d form.
pub fn canonical_json(value: &Value) -> String {
    sorted(&normalize(value.clone())).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn string_find(
    haystack: &Value,
    needle: &Value,
    start: Option<&Value>,
) -> Result<Value, BuiltinError> {
    let haystack = to_text(haystack);
    let needle = to_text(needle);
    let (haystack, needle) = (haystack.as_bytes(), needle.as_bytes());
    let len = haystack.len() as i64;

    // Offsets count bytes. Negative offsets count from the end.
    let start = match start {
        None | Some(Value::Null) => 0,
        Some(value) => to_offset(value)?,
    };
    let start = if start < 0 { (len + start).max(0) } else { start };
    if start > len {
        return Ok(Value::Null);
    }

    let start = start as usize;
    let tail = &haystack[start..];
    let found = if needle.is_empty() {
        Some(0)
    } else {
        tail.windows(needle.len()).position(|window| window == needle)
    };
    Ok(found.map_or(Value::Null, |pos| Value::from(start + pos)))
}

/// Offsets are truncated toward zero. Numeric strings are accepted.
fn to_offset(value: &Value) -> Result<i64, BuiltinError> {
    let invalid = || BuiltinError::InvalidArgument {
        name: "string.find",
        message: format!("start offset must be a number, got {}", to_text(value)),
    };
    let offset = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match offset {
        Some(f) if f.is_finite() => Ok(f.trunc() as i64),
        _ => Err(invalid()),
    }
}

fn to_number(value: &Value) -> Result<Value, BuiltinError> {
    let number = match value {
        Value::Number(n) => n.clone(),
        Value::String(s) => {
            let text = s.trim();
            match text.parse::<i64>() {
                Ok(int) => Number::from(int),
                Err(_) => text
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .ok_or_else(|| BuiltinError::Conversion(s.clone()))?,
            }
        }
        other => return Err(BuiltinError::Conversion(to_text(other))),
    };
    Ok(Value::Number(normalize_number(number)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaptureSink;
    use serde_json::json;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, BuiltinError> {
        Builtins::new(Arc::new(CaptureSink::new())).call(name, &args)
    }

    #[test]
    fn test_catalog_names() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("redis.call"), None);
    }

    #[test]
    fn test_argc() {
        assert!(Argc::range(2, 3).accepts(2));
        assert!(Argc::range(2, 3).accepts(3));
        assert!(!Argc::range(2, 3).accepts(4));
        assert!(!Argc::exact(1).accepts(0));
        assert_eq!(Argc::range(2, 3).to_string(), "2 to 3");
        assert_eq!(Argc::exact(1).to_string(), "1");
    }

    #[test]
    fn test_dispatch_checks_arity() {
        let err = call("tostring", vec![]).unwrap_err();
        assert!(matches!(
            err,
            BuiltinError::InvalidArgCount {
                name: "tostring",
                got: 0,
                ..
            }
        ));
        assert!(matches!(
            call("string.find", vec![json!("a"), json!("b"), json!(0), json!(1)]),
            Err(BuiltinError::InvalidArgCount { got: 4, .. })
        ));
    }

    #[test]
    fn test_dispatch_unknown() {
        assert!(matches!(
            call("math.floor", vec![json!(1.5)]),
            Err(BuiltinError::UnknownFunction(name)) if name == "math.floor"
        ));
    }

    #[test]
    fn test_string_find() {
        assert_eq!(
            call("string.find", vec![json!("hello world"), json!("world")]).unwrap(),
            json!(6)
        );
        assert_eq!(
            call("string.find", vec![json!("abc"), json!("z")]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_string_find_offset() {
        let find = |start: Value| {
            call("string.find", vec![json!("abcabc"), json!("bc"), start]).unwrap()
        };
        assert_eq!(find(json!(0)), json!(1));
        assert_eq!(find(json!(2)), json!(4));
        assert_eq!(find(json!(5)), Value::Null);
        assert_eq!(find(json!(-2)), json!(4));
        assert_eq!(find(json!(99)), Value::Null);
        assert_eq!(find(json!("2")), json!(4));
        assert_eq!(find(json!(2.7)), json!(4));
        assert_eq!(find(json!(-2.5)), json!(4));
        assert_eq!(find(json!(" 1 ")), json!(1));
        assert!(matches!(
            call("string.find", vec![json!("abc"), json!("b"), json!(true)]),
            Err(BuiltinError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_string_find_counts_bytes() {
        assert_eq!(
            call("string.find", vec![json!("héllo"), json!("llo")]).unwrap(),
            json!(3)
        );
        // A start inside a multi-byte character still searches from there.
        assert_eq!(
            call("string.find", vec![json!("héllo"), json!("l"), json!(2)]).unwrap(),
            json!(3)
        );
        assert_eq!(
            call("string.find", vec![json!("abc"), json!(""), json!(3)]).unwrap(),
            json!(3)
        );
        assert_eq!(
            call("string.find", vec![json!(12345), json!(34)]).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn test_cjson_decode() {
        assert_eq!(
            call("cjson.decode", vec![json!(r#"{"a":1}"#)]).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            call("cjson.decode", vec![json!("[1.0, null, 2]")]).unwrap(),
            json!([1])
        );
        assert!(matches!(
            call("cjson.decode", vec![json!("{invalid")]),
            Err(BuiltinError::Decode(_))
        ));
    }

    #[test]
    fn test_cjson_encode_stringifies() {
        assert_eq!(
            call("cjson.encode", vec![json!("a\"b")]).unwrap(),
            json!(r#""a\"b""#)
        );
        assert_eq!(call("cjson.encode", vec![json!(5)]).unwrap(), json!(r#""5""#));
        assert_eq!(call("cjson.encode", vec![json!("é")]).unwrap(), json!("\"é\""));
        // Tables are flattened to their text form first.
        assert_eq!(
            call("cjson.encode", vec![json!({"b": 1, "a": [true]})]).unwrap(),
            json!(r#""{\"a\":[true],\"b\":1}""#)
        );
    }

    #[test]
    fn test_tonumber() {
        assert_eq!(call("tonumber", vec![json!("42")]).unwrap(), json!(42));
        assert!(call("tonumber", vec![json!("42")]).unwrap().is_i64());
        assert_eq!(call("tonumber", vec![json!("3.14")]).unwrap(), json!(3.14));
        assert!(call("tonumber", vec![json!("3.14")]).unwrap().is_f64());
        assert_eq!(call("tonumber", vec![json!(" -7 ")]).unwrap(), json!(-7));
        assert_eq!(call("tonumber", vec![json!(2.5)]).unwrap(), json!(2.5));
        // Whole results are integers, however they were written.
        assert!(call("tonumber", vec![json!("1e2")]).unwrap().is_i64());
        assert_eq!(call("tonumber", vec![json!("1e2")]).unwrap(), json!(100));
        assert_eq!(call("tonumber", vec![json!("4.0")]).unwrap(), json!(4));
        assert!(call("tonumber", vec![json!(4.0)]).unwrap().is_i64());
        assert!(matches!(
            call("tonumber", vec![json!("x")]),
            Err(BuiltinError::Conversion(s)) if s == "x"
        ));
        assert!(matches!(
            call("tonumber", vec![json!("inf")]),
            Err(BuiltinError::Conversion(_))
        ));
        assert!(call("tonumber", vec![Value::Null]).is_err());
    }

    #[test]
    fn test_tostring() {
        assert_eq!(call("tostring", vec![json!(true)]).unwrap(), json!("true"));
        assert_eq!(call("tostring", vec![json!(false)]).unwrap(), json!("false"));
        assert_eq!(call("tostring", vec![Value::Null]).unwrap(), json!("nil"));
        assert_eq!(call("tostring", vec![json!(5)]).unwrap(), json!("5"));
        assert_eq!(call("tostring", vec![json!(1.5)]).unwrap(), json!("1.5"));
        assert_eq!(call("tostring", vec![json!(3.0)]).unwrap(), json!("3"));
        assert_eq!(call("tostring", vec![json!(1e15)]).unwrap(), json!("1e+15"));
        assert_eq!(call("tostring", vec![json!("s")]).unwrap(), json!("s"));
        assert_eq!(
            call("tostring", vec![json!({"z": null, "a": [1, 2.0, null, 3]})]).unwrap(),
            json!(r#"{"a":[1,2]}"#)
        );
    }

    #[test]
    fn test_type() {
        let ty = |value: Value| call("type", vec![value]).unwrap();
        assert_eq!(ty(json!(true)), json!("boolean"));
        assert_eq!(ty(json!({})), json!("table"));
        assert_eq!(ty(json!([1, 2])), json!("table"));
        assert_eq!(ty(json!(1.5)), json!("number"));
        assert_eq!(ty(json!(3)), json!("number"));
        assert_eq!(ty(json!("s")), json!("string"));
        assert_eq!(ty(Value::Null), json!("nil"));
    }

    #[test]
    fn test_redis_log() {
        let sink = Arc::new(CaptureSink::new());
        let builtins = Builtins::new(sink.clone());

        let result = builtins
            .call("redis.log", &[json!("warning"), json!("oops")])
            .unwrap();
        assert_eq!(result, Value::Null);
        builtins.call("redis.log", &[json!(3), json!(true)]).unwrap();

        assert_eq!(sink.lines(), vec!["warning: oops", "3: true"]);
    }
}

//! Builtin function calls.
//!
//! Most calls are emitted as-is. Functions whose native behavior differs from
//! the in-memory runtime go through small helper functions that are emitted
//! once at the top of the chunk.

use std::collections::BTreeSet;

use rhizome_scarlet_runtime_memory::Builtin;

use super::{CompileError, is_identifier};

/// Helper functions the generated code may depend on. Ordered so that a
/// helper is emitted after the helpers it calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Helper {
    ToString,
    StringFind,
    ToNumber,
}

impl Helper {
    pub(super) fn source(self) -> &'static str {
        match self {
            Helper::ToString => TO_STRING,
            Helper::StringFind => STRING_FIND,
            Helper::ToNumber => TO_NUMBER,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Helper::ToString => "__scarlet_tostring",
            Helper::StringFind => "__scarlet_string_find",
            Helper::ToNumber => "__scarlet_tonumber",
        }
    }

    fn requires(self) -> &'static [Helper] {
        match self {
            Helper::ToString => &[],
            Helper::StringFind | Helper::ToNumber => &[Helper::ToString],
        }
    }
}

const TO_STRING: &str = r#"local function __scarlet_tostring(v)
    if type(v) == "table" then
        return cjson.encode(v)
    end
    return tostring(v)
end
"#;

const STRING_FIND: &str = r#"local function __scarlet_string_find(s, needle, start)
    s = __scarlet_tostring(s)
    if start == nil then
        start = 0
    elseif tonumber(start) == nil then
        error("string.find: start offset must be a number, got " .. __scarlet_tostring(start))
    else
        start = tonumber(start)
    end
    if start < 0 then
        start = math.max(#s + math.ceil(start), 0)
    else
        start = math.floor(start)
    end
    if start > #s then
        return nil
    end
    local pos = string.find(s, __scarlet_tostring(needle), start + 1, true)
    if pos == nil then
        return nil
    end
    return pos - 1
end
"#;

const TO_NUMBER: &str = r#"local function __scarlet_tonumber(v)
    local n = tonumber(v)
    if n == nil then
        error("cannot convert to number: " .. __scarlet_tostring(v))
    end
    return n
end
"#;

/// Compile a call to `name` with already compiled arguments.
pub(super) fn compile_call(
    name: &str,
    args: Vec<String>,
    helpers: &mut BTreeSet<Helper>,
) -> Result<String, CompileError> {
    if let Some(builtin) = Builtin::lookup(name) {
        let argc = builtin.argc();
        if !argc.accepts(args.len()) {
            return Err(CompileError::InvalidArgCount {
                name: name.to_string(),
                expected: argc,
                got: args.len(),
            });
        }
    } else if !name.split('.').all(is_identifier) {
        return Err(CompileError::InvalidFunctionName(name.to_string()));
    }

    let joined = args.join(", ");
    let code = match name {
        "string.find" => format!("{}({joined})", use_helper(helpers, Helper::StringFind)),
        "tostring" => format!("{}({joined})", use_helper(helpers, Helper::ToString)),
        "tonumber" => format!("{}({joined})", use_helper(helpers, Helper::ToNumber)),
        // The argument is stringified first, matching the in-memory runtime.
        "cjson.encode" => format!(
            "cjson.encode({}({joined}))",
            use_helper(helpers, Helper::ToString)
        ),
        _ => format!("{name}({joined})"),
    };
    Ok(code)
}

fn use_helper(helpers: &mut BTreeSet<Helper>, helper: Helper) -> &'static str {
    for required in helper.requires() {
        helpers.insert(*required);
    }
    helpers.insert(helper);
    helper.name()
}

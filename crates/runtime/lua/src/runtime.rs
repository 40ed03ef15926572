//! LuaJIT execution with the server's script environment.

use std::sync::Arc;

use mlua::{Lua, LuaSerdeExt, SerializeOptions};
use rhizome_scarlet_ir::{ScriptObj, validate};
use rhizome_scarlet_runtime_memory::{LogSink, StdoutSink, canonical_json, normalize};
use serde_json::Value;
use tracing::debug;

use crate::{ExecutionError, emit};

/// Defines the `redis` table on top of the Rust-side log hook.
const BOOTSTRAP: &str = r#"
redis = {
    LOG_DEBUG = 0,
    LOG_VERBOSE = 1,
    LOG_NOTICE = 2,
    LOG_WARNING = 3,
}

local function text(v)
    if type(v) == "table" then
        return cjson.encode(v)
    end
    return tostring(v)
end

function redis.log(level, message)
    __scarlet_log(text(level) .. ": " .. text(message))
end
"#;

/// Runs compiled scripts in LuaJIT.
///
/// The environment provides `KEYS`, `ARGV`, `cjson` and `redis.log`, which
/// is all generated code relies on.
pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    /// Create a runtime that logs to stdout.
    pub fn new() -> Result<Self, ExecutionError> {
        Self::with_sink(Arc::new(StdoutSink))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Result<Self, ExecutionError> {
        let lua = Lua::new();
        install_cjson(&lua)?;

        let log_fn = lua.create_function(move |_, line: String| {
            sink.write_line(&line);
            Ok(())
        })?;
        lua.globals().set("__scarlet_log", log_fn)?;
        lua.load(BOOTSTRAP).set_name("bootstrap").exec()?;

        Ok(Self { lua })
    }

    /// Get the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Compile and run `script` with the given key names and JSON arguments.
    pub fn execute(
        &self,
        script: &ScriptObj,
        keys: &[String],
        args: &[Value],
    ) -> Result<Value, ExecutionError> {
        validate(script)?;
        if keys.len() != script.keyv.len() {
            return Err(ExecutionError::InputCount {
                what: "keys",
                expected: script.keyv.len(),
                got: keys.len(),
            });
        }
        if args.len() != script.argv.len() {
            return Err(ExecutionError::InputCount {
                what: "args",
                expected: script.argv.len(),
                got: args.len(),
            });
        }

        let code = emit(script)?;
        debug!(bytes = code.len(), "emitted lua");
        match self.execute_lua(&code, keys, args)? {
            // Generated code returns its value JSON encoded.
            Value::String(encoded) => Ok(serde_json::from_str(&encoded)?),
            other => Ok(other),
        }
    }

    /// Run a Lua chunk with `KEYS` and `ARGV` bound. Arguments are passed
    /// JSON encoded, as a client would send them.
    pub fn execute_lua(
        &self,
        code: &str,
        keys: &[String],
        args: &[Value],
    ) -> Result<Value, ExecutionError> {
        let globals = self.lua.globals();
        globals.set("KEYS", self.lua.create_sequence_from(keys.iter().cloned())?)?;
        let argv = args
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        globals.set("ARGV", self.lua.create_sequence_from(argv)?)?;

        let result: mlua::Value = self.lua.load(code).set_name("script").eval()?;
        let result: Value = self.lua.from_value(result)?;
        Ok(normalize(result))
    }
}

/// Installs a `cjson` table backed by serde_json.
fn install_cjson(lua: &Lua) -> mlua::Result<()> {
    let cjson = lua.create_table()?;

    let decode_fn = lua.create_function(|lua_ctx, text: String| {
        let value: Value = serde_json::from_str(&text).map_err(mlua::Error::external)?;
        // Tables never hold nil, so nulls are removed before conversion and a
        // top-level null becomes nil. Empty arrays decode as plain tables.
        let options = SerializeOptions::new()
            .serialize_none_to_null(false)
            .serialize_unit_to_null(false)
            .set_array_metatable(false);
        lua_ctx.to_value_with(&normalize(value), options)
    })?;
    cjson.set("decode", decode_fn)?;

    let encode_fn = lua.create_function(|lua_ctx, value: mlua::Value| {
        let value: Value = lua_ctx.from_value(value)?;
        Ok(canonical_json(&value))
    })?;
    cjson.set("encode", encode_fn)?;

    lua.globals().set("cjson", cjson)
}

//! Lua 5.4 provider backed by `mlua`.
//!
//! Host objects become userdata whose `__index` resolves properties to values
//! and methods to functions. Both `obj:method(...)` and `obj.method(...)` work:
//! a leading argument that is the object itself is dropped.

use std::sync::Arc;

use mlua::{Lua, MetaMethod, MultiValue, UserData, UserDataMethods, Value};

use crate::error::ScriptError;
use crate::output::Stream;
use crate::provider::{EngineContext, EngineInstance, ScriptProvider, ScriptSource};
use crate::value::{BoundObject, DomValue};

const BOOTSTRAP: &str = include_str!("../../bootstrap/init.lua");

const NEW_FILE_TEMPLATE: &str = "\
-- New Lua script
console:log(\"Hello from \" .. process.platform)
";

/// Lua language provider.
#[derive(Debug, Clone)]
pub struct LuaProvider {
    extensions: Vec<String>,
}

impl LuaProvider {
    pub fn new() -> Self {
        Self {
            extensions: vec![".lua".to_string()],
        }
    }
}

impl Default for LuaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptProvider for LuaProvider {
    fn id(&self) -> &str {
        "lua"
    }

    fn display_name(&self) -> &str {
        "Lua"
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn bootstrap(&self) -> Option<ScriptSource> {
        Some(ScriptSource::inline("bootstrap.lua", BOOTSTRAP))
    }

    fn new_file_template(&self) -> &str {
        NEW_FILE_TEMPLATE
    }

    fn create_engine(&self, ctx: &EngineContext) -> Result<Box<dyn EngineInstance>, String> {
        let lua = Lua::new();

        let out = Arc::clone(&ctx.output);
        let print = lua
            .create_function(move |_, args: MultiValue| {
                let text = args
                    .into_iter()
                    .map(|v| from_lua(v).to_string())
                    .collect::<Vec<_>>()
                    .join("\t");
                out.print(Stream::Out, &format!("{text}\n"))
                    .map_err(mlua::Error::external)
            })
            .map_err(|e| e.to_string())?;
        lua.globals()
            .set("print", print)
            .map_err(|e| e.to_string())?;

        log::debug!("Created Lua state");
        Ok(Box::new(LuaInstance { lua }))
    }
}

struct LuaInstance {
    lua: Lua,
}

impl EngineInstance for LuaInstance {
    fn inject(&mut self, name: &str, value: DomValue) -> Result<(), ScriptError> {
        let value = to_lua(&self.lua, value).map_err(|e| ScriptError::new(e.to_string()))?;
        self.lua
            .globals()
            .set(name, value)
            .map_err(|e| ScriptError::new(e.to_string()))
    }

    fn evaluate(&mut self, source: &ScriptSource) -> Result<(), ScriptError> {
        self.lua
            .load(source.text.as_str())
            .set_name(format!("@{}", source.name))
            .exec()
            .map_err(|e| lua_error(&e, &source.name))
    }
}

/// Userdata wrapper of a host object.
struct LuaHandle(BoundObject);

impl UserData for LuaHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: String| {
            if this.0.properties().contains(&key.as_str()) {
                return to_lua(lua, this.0.get(&key).unwrap_or_default());
            }
            if !this.0.methods().contains(&key.as_str()) {
                return Ok(Value::Nil);
            }
            let obj = Arc::clone(&this.0);
            let function = lua.create_function(move |lua, args: MultiValue| {
                let mut args: Vec<Value> = args.into_iter().collect();
                let is_self = match args.first() {
                    Some(Value::UserData(ud)) => ud
                        .borrow::<LuaHandle>()
                        .map(|h| Arc::ptr_eq(&h.0, &obj))
                        .unwrap_or(false),
                    _ => false,
                };
                if is_self {
                    args.remove(0);
                }
                let args: Vec<DomValue> = args.into_iter().map(from_lua).collect();
                let result = obj.call(&key, &args).map_err(mlua::Error::RuntimeError)?;
                to_lua(lua, result)
            })?;
            Ok(Value::Function(function))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("[object {}]", this.0.type_name()))
        });
    }
}

fn to_lua(lua: &Lua, value: DomValue) -> mlua::Result<Value> {
    Ok(match value {
        DomValue::Unit => Value::Nil,
        DomValue::Bool(b) => Value::Boolean(b),
        DomValue::Int(i) => Value::Integer(i),
        DomValue::Float(x) => Value::Number(x),
        DomValue::Str(s) => Value::String(lua.create_string(&s)?),
        DomValue::List(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.into_iter().enumerate() {
                table.raw_set(i + 1, to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
        DomValue::Map(map) => {
            let table = lua.create_table()?;
            for (key, item) in map {
                table.raw_set(key, to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
        DomValue::Object(obj) => Value::UserData(lua.create_userdata(LuaHandle(obj))?),
    })
}

fn from_lua(value: Value) -> DomValue {
    match value {
        Value::Nil => DomValue::Unit,
        Value::Boolean(b) => DomValue::Bool(b),
        Value::Integer(i) => DomValue::Int(i),
        Value::Number(x) => DomValue::Float(x),
        Value::String(s) => DomValue::Str(s.to_string_lossy()),
        Value::Table(table) => {
            let len = table.raw_len();
            if len > 0 {
                let items = (1..=len)
                    .map(|i| table.raw_get::<Value>(i).map(from_lua).unwrap_or_default())
                    .collect();
                return DomValue::List(items);
            }
            let map = table
                .pairs::<Value, Value>()
                .filter_map(Result::ok)
                .map(|(k, v)| (from_lua(k).to_string(), from_lua(v)))
                .collect();
            DomValue::Map(map)
        }
        Value::UserData(ud) => match ud.borrow::<LuaHandle>() {
            Ok(handle) => DomValue::Object(Arc::clone(&handle.0)),
            Err(_) => DomValue::Str("userdata".to_string()),
        },
        other => DomValue::Str(other.type_name().to_string()),
    }
}

/// Convert an `mlua` error, extracting `name:LINE:` when present.
fn lua_error(err: &mlua::Error, name: &str) -> ScriptError {
    let message = err.to_string();
    let line = line_of(&message, name);
    ScriptError::new(message).in_source(name).at(line, None)
}

fn line_of(message: &str, name: &str) -> Option<usize> {
    let prefix = format!("{name}:");
    let start = message.find(&prefix)? + prefix.len();
    let digits: String = message[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemorySink, OutputMultiplexer};
    use crate::value::DomObject;

    struct Greeter;

    impl DomObject for Greeter {
        fn type_name(&self) -> &str {
            "Greeter"
        }
        fn methods(&self) -> &[&'static str] {
            &["greet"]
        }
        fn properties(&self) -> &[&'static str] {
            &["name"]
        }
        fn call(&self, _method: &str, args: &[DomValue]) -> Result<DomValue, String> {
            Ok(DomValue::Str(format!("hello {}", args[0])))
        }
        fn get(&self, _property: &str) -> Option<DomValue> {
            Some(DomValue::from("greeter"))
        }
    }

    fn engine() -> (Box<dyn EngineInstance>, Arc<MemorySink>) {
        let output = Arc::new(OutputMultiplexer::with_destinations(
            Box::new(std::io::sink()),
            Box::new(std::io::sink()),
        ));
        let sink = Arc::new(MemorySink::new());
        output.set_sink(Some(sink.clone()));
        output.begin();
        let engine = LuaProvider::new()
            .create_engine(&EngineContext { output })
            .unwrap();
        (engine, sink)
    }

    #[test]
    fn test_colon_and_dot_calls_reach_host_object() {
        let (mut engine, sink) = engine();
        engine
            .inject("g", DomValue::Object(Arc::new(Greeter)))
            .unwrap();
        engine
            .evaluate(&ScriptSource::inline(
                "t.lua",
                "print(g:greet('a')); print(g.greet('b')); print(g.name)",
            ))
            .unwrap();
        assert_eq!(sink.text(), "hello a\nhello b\ngreeter\n");
    }

    #[test]
    fn test_exit_marker_from_bootstrap() {
        let (mut engine, _) = engine();
        engine
            .evaluate(&LuaProvider::new().bootstrap().unwrap())
            .unwrap();
        let err = engine
            .evaluate(&ScriptSource::inline("quit.lua", "exit()"))
            .unwrap_err();
        assert!(err.is_exit());
    }

    #[test]
    fn test_runtime_error_line() {
        let (mut engine, _) = engine();
        let err = engine
            .evaluate(&ScriptSource::inline("bad.lua", "local x = 1\nerror('boom')"))
            .unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("boom"));
    }
}

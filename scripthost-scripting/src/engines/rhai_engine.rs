//! Embedded Rhai provider.
//!
//! Host objects are wrapped in [`DomHandle`] and their methods are registered
//! as native functions dispatching on the method name, one registration per
//! name and arity. Functions defined by the bootstrap stay callable from the
//! user script because the instance keeps their AST between evaluations.
//!
//! Dispatchers are registered at injection time, for the method and property
//! names of every object reachable from an injected value. The engine cannot
//! gain functions while a script runs, so an object first returned by a call
//! during evaluation only answers to names already registered. Anything else
//! on it is reached with `obj.invoke("name", [args])` for methods and
//! `obj["name"]` for properties.

use std::collections::HashSet;

use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, ParseError, Position, Scope};

use crate::error::ScriptError;
use crate::output::Stream;
use crate::provider::{EngineContext, EngineInstance, ScriptProvider, ScriptSource};
use crate::value::{BoundObject, DomValue};

const BOOTSTRAP: &str = include_str!("../../bootstrap/init.rhai");

const NEW_FILE_TEMPLATE: &str = "\
// New Rhai script
console.log(\"Hello from \" + process.platform);
";

/// Names Rhai reserves for its own functions; never registered as methods.
const RESERVED: &[&str] = &[
    "print", "debug", "type_of", "eval", "call", "curry", "is_shared", "Fn", "is_def_fn",
    "is_def_var",
];

/// The built-in Rhai language provider.
#[derive(Debug, Clone)]
pub struct RhaiProvider {
    id: String,
    name: String,
    extensions: Vec<String>,
    max_operations: u64,
}

impl RhaiProvider {
    /// `rhai` provider owning `.rhai` files.
    pub fn new() -> Self {
        Self::with_identity("rhai", "Rhai", &[".rhai"])
    }

    /// Rhai provider registered under another identity.
    pub fn with_identity(id: &str, name: &str, extensions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            max_operations: 0,
        }
    }

    /// Fail scripts after `limit` operations. Zero means unlimited.
    pub fn with_max_operations(mut self, limit: u64) -> Self {
        self.max_operations = limit;
        self
    }
}

impl Default for RhaiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptProvider for RhaiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn bootstrap(&self) -> Option<ScriptSource> {
        Some(ScriptSource::inline("<bootstrap:rhai>", BOOTSTRAP))
    }

    fn new_file_template(&self) -> &str {
        NEW_FILE_TEMPLATE
    }

    fn create_engine(&self, ctx: &EngineContext) -> Result<Box<dyn EngineInstance>, String> {
        let mut engine = Engine::new();
        engine.set_max_operations(self.max_operations);

        let out = std::sync::Arc::clone(&ctx.output);
        engine.on_print(move |text| {
            if let Err(e) = out.print(Stream::Out, &format!("{text}\n")) {
                log::warn!("Rhai print failed: {}", e);
            }
        });
        let out = std::sync::Arc::clone(&ctx.output);
        engine.on_debug(move |text, source, pos| {
            let line = match (source, pos.line()) {
                (Some(src), Some(line)) => format!("[{src}:{line}] {text}\n"),
                (None, Some(line)) => format!("[line {line}] {text}\n"),
                _ => format!("{text}\n"),
            };
            if let Err(e) = out.print(Stream::Out, &line) {
                log::warn!("Rhai debug failed: {}", e);
            }
        });

        engine.register_type_with_name::<DomHandle>("DomObject");
        engine.register_fn("to_string", |h: &mut DomHandle| h.label());
        engine.register_fn("type_name", |h: &mut DomHandle| h.0.type_name().to_string());
        engine.register_fn(
            "invoke",
            |h: &mut DomHandle, method: &str, args: Array| h.call(method, args),
        );
        engine.register_indexer_get(|h: &mut DomHandle, property: &str| h.get(property));

        log::debug!("Created Rhai engine '{}'", self.id);
        Ok(Box::new(RhaiInstance {
            engine,
            scope: Scope::new(),
            functions: AST::empty(),
            methods: HashSet::new(),
            properties: HashSet::new(),
        }))
    }
}

/// Script-side handle to a host object.
#[derive(Clone)]
pub struct DomHandle(BoundObject);

impl DomHandle {
    fn label(&self) -> String {
        format!("[object {}]", self.0.type_name())
    }

    fn call(&self, method: &str, args: Array) -> Result<Dynamic, Box<EvalAltResult>> {
        let args: Vec<DomValue> = args.into_iter().map(from_dynamic).collect();
        self.0
            .call(method, &args)
            .map(to_dynamic)
            .map_err(|msg| msg.into())
    }

    fn get(&self, property: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        self.0
            .get(property)
            .map(to_dynamic)
            .ok_or_else(|| format!("{} has no property '{}'", self.0.type_name(), property).into())
    }
}

struct RhaiInstance {
    engine: Engine,
    scope: Scope<'static>,
    /// Functions defined by earlier evaluations.
    functions: AST,
    methods: HashSet<&'static str>,
    properties: HashSet<&'static str>,
}

impl RhaiInstance {
    /// Register dispatchers for every object reachable from `value`.
    fn register_objects(&mut self, value: &DomValue) {
        match value {
            DomValue::Object(obj) => {
                for &method in obj.methods() {
                    if RESERVED.contains(&method) {
                        log::debug!(
                            "{}.{} shadows a Rhai builtin and is only reachable through invoke()",
                            obj.type_name(),
                            method
                        );
                        continue;
                    }
                    if self.methods.insert(method) {
                        register_method(&mut self.engine, method);
                    }
                }
                for &property in obj.properties() {
                    if self.properties.insert(property) {
                        self.engine
                            .register_get(property, move |h: &mut DomHandle| h.get(property));
                    }
                }
            }
            DomValue::List(items) => items.iter().for_each(|item| self.register_objects(item)),
            DomValue::Map(map) => map.values().for_each(|item| self.register_objects(item)),
            _ => {}
        }
    }
}

/// Dispatchers for up to four arguments. Longer calls go through `invoke`.
fn register_method(engine: &mut Engine, name: &'static str) {
    engine.register_fn(name, move |h: &mut DomHandle| h.call(name, Array::new()));
    engine.register_fn(name, move |h: &mut DomHandle, a: Dynamic| h.call(name, vec![a]));
    engine.register_fn(name, move |h: &mut DomHandle, a: Dynamic, b: Dynamic| {
        h.call(name, vec![a, b])
    });
    engine.register_fn(
        name,
        move |h: &mut DomHandle, a: Dynamic, b: Dynamic, c: Dynamic| h.call(name, vec![a, b, c]),
    );
    engine.register_fn(
        name,
        move |h: &mut DomHandle, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
            h.call(name, vec![a, b, c, d])
        },
    );
}

impl EngineInstance for RhaiInstance {
    fn inject(&mut self, name: &str, value: DomValue) -> Result<(), ScriptError> {
        self.register_objects(&value);
        self.scope.push_dynamic(name.to_string(), to_dynamic(value));
        Ok(())
    }

    fn evaluate(&mut self, source: &ScriptSource) -> Result<(), ScriptError> {
        let mut ast = self
            .engine
            .compile(&source.text)
            .map_err(|e| parse_error(e, &source.name))?;
        ast.set_source(source.name.as_str());

        let merged = self.functions.merge(&ast);
        let result = self.engine.run_ast_with_scope(&mut self.scope, &merged);
        self.functions = merged.clone_functions_only();

        result.map_err(|e| eval_error(*e, &source.name))
    }
}

fn parse_error(err: ParseError, name: &str) -> ScriptError {
    let pos = err.position();
    ScriptError::new(format!("Syntax error: {}", err.err_type()))
        .in_source(name)
        .at(pos.line(), pos.position())
}

fn eval_error(mut err: EvalAltResult, name: &str) -> ScriptError {
    let pos: Position = err.take_position();
    ScriptError::new(err.to_string())
        .in_source(name)
        .at(pos.line(), pos.position())
}

/// Convert a binding value into a Rhai value.
pub fn to_dynamic(value: DomValue) -> Dynamic {
    match value {
        DomValue::Unit => Dynamic::UNIT,
        DomValue::Bool(b) => Dynamic::from_bool(b),
        DomValue::Int(i) => Dynamic::from_int(i),
        DomValue::Float(x) => Dynamic::from_float(x),
        DomValue::Str(s) => Dynamic::from(s),
        DomValue::List(items) => Dynamic::from_array(items.into_iter().map(to_dynamic).collect()),
        DomValue::Map(map) => Dynamic::from_map(
            map.into_iter()
                .map(|(k, v)| (k.into(), to_dynamic(v)))
                .collect(),
        ),
        DomValue::Object(obj) => Dynamic::from(DomHandle(obj)),
    }
}

/// Convert a Rhai value into a binding value.
pub fn from_dynamic(value: Dynamic) -> DomValue {
    if value.is_unit() {
        return DomValue::Unit;
    }
    if let Ok(b) = value.as_bool() {
        return DomValue::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return DomValue::Int(i);
    }
    if let Ok(x) = value.as_float() {
        return DomValue::Float(x);
    }
    if let Ok(c) = value.as_char() {
        return DomValue::Str(c.to_string());
    }
    if value.is_string() {
        return match value.into_string() {
            Ok(s) => DomValue::Str(s),
            Err(type_name) => DomValue::Str(type_name.to_string()),
        };
    }
    if value.is_array() {
        return match value.into_array() {
            Ok(items) => DomValue::List(items.into_iter().map(from_dynamic).collect()),
            Err(type_name) => DomValue::Str(type_name.to_string()),
        };
    }
    if value.is_map() {
        if let Some(map) = value.try_cast::<rhai::Map>() {
            return DomValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), from_dynamic(v)))
                    .collect(),
            );
        }
        return DomValue::Unit;
    }
    if value.is::<DomHandle>() {
        if let Some(handle) = value.try_cast::<DomHandle>() {
            return DomValue::Object(handle.0);
        }
        return DomValue::Unit;
    }
    DomValue::Str(value.to_string())
}

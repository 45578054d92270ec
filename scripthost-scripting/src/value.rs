//! Engine-neutral value model for DOM bindings.
//!
//! Bindings are expressed as [`DomValue`]s so that every engine provider can
//! translate them into its own representation. Host objects implement
//! [`DomObject`] and expose named methods and read-only properties; the two
//! optional capabilities (DOM root delegation and disposal) are discovered
//! through accessor methods rather than inheritance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a host object bound into a script.
pub type BoundObject = Arc<dyn DomObject>;

/// A value that can cross the boundary between the host and a script engine.
#[derive(Clone, Default)]
pub enum DomValue {
    /// Absent value (`null`, `nil`, `()`).
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<DomValue>),
    Map(BTreeMap<String, DomValue>),
    /// Host object with methods and properties.
    Object(BoundObject),
}

impl DomValue {
    pub fn is_unit(&self) -> bool {
        matches!(self, DomValue::Unit)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DomValue::Int(i) => Some(*i),
            DomValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BoundObject> {
        match self {
            DomValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Snapshot of the value as JSON. Objects become their type name.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DomValue::Unit => Value::Null,
            DomValue::Bool(b) => Value::Bool(*b),
            DomValue::Int(i) => Value::from(*i),
            DomValue::Float(f) => Value::from(*f),
            DomValue::Str(s) => Value::String(s.clone()),
            DomValue::List(items) => Value::Array(items.iter().map(DomValue::to_json).collect()),
            DomValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            DomValue::Object(obj) => Value::String(format!("[object {}]", obj.type_name())),
        }
    }
}

impl fmt::Debug for DomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomValue::Unit => write!(f, "Unit"),
            DomValue::Bool(b) => write!(f, "Bool({b})"),
            DomValue::Int(i) => write!(f, "Int({i})"),
            DomValue::Float(x) => write!(f, "Float({x})"),
            DomValue::Str(s) => write!(f, "Str({s:?})"),
            DomValue::List(items) => f.debug_list().entries(items).finish(),
            DomValue::Map(map) => f.debug_map().entries(map).finish(),
            DomValue::Object(obj) => write!(f, "Object({})", obj.type_name()),
        }
    }
}

/// Console rendering: `(null)` for unit, `{k: v}` for maps.
impl fmt::Display for DomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomValue::Unit => write!(f, "(null)"),
            DomValue::Bool(b) => write!(f, "{b}"),
            DomValue::Int(i) => write!(f, "{i}"),
            DomValue::Float(x) => write!(f, "{x}"),
            DomValue::Str(s) => write!(f, "{s}"),
            DomValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            DomValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            DomValue::Object(obj) => write!(f, "[object {}]", obj.type_name()),
        }
    }
}

/// Objects compare by identity.
impl PartialEq for DomValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DomValue::Unit, DomValue::Unit) => true,
            (DomValue::Bool(a), DomValue::Bool(b)) => a == b,
            (DomValue::Int(a), DomValue::Int(b)) => a == b,
            (DomValue::Float(a), DomValue::Float(b)) => a == b,
            (DomValue::Str(a), DomValue::Str(b)) => a == b,
            (DomValue::List(a), DomValue::List(b)) => a == b,
            (DomValue::Map(a), DomValue::Map(b)) => a == b,
            (DomValue::Object(a), DomValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for DomValue {
    fn from(b: bool) -> Self {
        DomValue::Bool(b)
    }
}

impl From<i64> for DomValue {
    fn from(i: i64) -> Self {
        DomValue::Int(i)
    }
}

impl From<f64> for DomValue {
    fn from(x: f64) -> Self {
        DomValue::Float(x)
    }
}

impl From<&str> for DomValue {
    fn from(s: &str) -> Self {
        DomValue::Str(s.to_string())
    }
}

impl From<String> for DomValue {
    fn from(s: String) -> Self {
        DomValue::Str(s)
    }
}

impl From<Vec<DomValue>> for DomValue {
    fn from(items: Vec<DomValue>) -> Self {
        DomValue::List(items)
    }
}

impl From<BoundObject> for DomValue {
    fn from(obj: BoundObject) -> Self {
        DomValue::Object(obj)
    }
}

/// A host object reachable from scripts.
///
/// Methods receive already-converted arguments and report failures as plain
/// strings, which engines raise as script-level errors.
pub trait DomObject: Send + Sync + 'static {
    /// Name shown in diagnostics and `[object ...]` renderings.
    fn type_name(&self) -> &str;

    /// Callable method names.
    fn methods(&self) -> &[&'static str] {
        &[]
    }

    /// Readable property names.
    fn properties(&self) -> &[&'static str] {
        &[]
    }

    /// Invoke a method.
    fn call(&self, method: &str, args: &[DomValue]) -> Result<DomValue, String> {
        let _ = args;
        Err(format!("{} has no method '{}'", self.type_name(), method))
    }

    /// Read a property. `None` when the property does not exist.
    fn get(&self, property: &str) -> Option<DomValue> {
        let _ = property;
        None
    }

    /// Delegation capability: the object is a factory for the real DOM root.
    fn as_dom_factory(&self) -> Option<&dyn DomFactory> {
        None
    }

    /// Disposal capability: the object holds resources released after a run.
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }
}

/// Produces the value actually bound in place of the factory object.
pub trait DomFactory {
    /// The DOM root. `None` means the binding is skipped.
    fn dom_root(&self) -> Option<DomValue>;
}

/// Releases resources held by a bound object.
pub trait Disposable {
    fn dispose(&self) -> Result<(), String>;
}

/// Check the argument count of a method call.
pub fn expect_args(method: &str, args: &[DomValue], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        if min == max {
            return Err(format!(
                "{method}() expects {min} argument(s), got {}",
                args.len()
            ));
        }
        return Err(format!(
            "{method}() expects {min} to {max} arguments, got {}",
            args.len()
        ));
    }
    Ok(())
}

/// Extract a string argument.
pub fn str_arg<'a>(method: &str, args: &'a [DomValue], index: usize) -> Result<&'a str, String> {
    args.get(index)
        .and_then(DomValue::as_str)
        .ok_or_else(|| format!("{method}() argument {} must be a string", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl DomObject for Named {
        fn type_name(&self) -> &str {
            "Named"
        }
    }

    #[test]
    fn test_display_matches_console_rendering() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), DomValue::Int(1));
        map.insert("b".to_string(), DomValue::Unit);
        assert_eq!(DomValue::Map(map).to_string(), "{a: 1, b: (null)}");
        assert_eq!(
            DomValue::List(vec![DomValue::from("x"), DomValue::Bool(true)]).to_string(),
            "[x, true]"
        );
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let a: BoundObject = Arc::new(Named);
        let b: BoundObject = Arc::new(Named);
        assert_eq!(DomValue::Object(a.clone()), DomValue::Object(a.clone()));
        assert_ne!(DomValue::Object(a), DomValue::Object(b));
    }

    #[test]
    fn test_default_capabilities_are_absent() {
        let obj = Named;
        assert!(obj.as_dom_factory().is_none());
        assert!(obj.as_disposable().is_none());
        assert!(obj.call("missing", &[]).is_err());
    }

    #[test]
    fn test_json_snapshot() {
        let value = DomValue::List(vec![DomValue::Int(2), DomValue::Object(Arc::new(Named))]);
        assert_eq!(value.to_json(), serde_json::json!([2, "[object Named]"]));
    }

    #[test]
    fn test_expect_args() {
        assert!(expect_args("log", &[], 0, 2).is_ok());
        let err = expect_args("write_file", &[DomValue::Unit], 2, 3).unwrap_err();
        assert!(err.contains("2 to 3"));
    }
}

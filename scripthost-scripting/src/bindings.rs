//! DOM binding registry.
//!
//! Binding descriptors are contributed independently (statically registered
//! or enumerated from [`BindingContributions`] sources) and are instantiated
//! fresh for every run. A broken contributor is logged and skipped so it can
//! never disable the others.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::BindingError;
use crate::value::{BoundObject, DomValue};

/// Result of a binding factory: `Ok(None)` means "nothing to bind".
pub type FactoryResult = Result<Option<DomValue>, String>;

type FactoryFn = dyn Fn() -> FactoryResult + Send + Sync;

/// A named binding contribution.
#[derive(Clone)]
pub struct BindingDescriptor {
    /// Global name the script sees.
    pub variable_name: String,
    factory: Arc<FactoryFn>,
}

impl BindingDescriptor {
    /// Descriptor with a zero-argument factory.
    pub fn new<F>(variable_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> FactoryResult + Send + Sync + 'static,
    {
        Self {
            variable_name: variable_name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Descriptor binding a fresh clone of a plain value on every run.
    pub fn value(variable_name: impl Into<String>, value: DomValue) -> Self {
        Self::new(variable_name, move || Ok(Some(value.clone())))
    }

    /// Descriptor creating a new host object on every run.
    pub fn object<F>(variable_name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> BoundObject + Send + Sync + 'static,
    {
        Self::new(variable_name, move || Ok(Some(DomValue::Object(make()))))
    }

    /// Run the factory, converting errors and panics into [`BindingError`].
    pub fn instantiate(&self) -> Result<Option<DomValue>, BindingError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.factory)()));
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(BindingError::Instantiation {
                name: self.variable_name.clone(),
                reason,
            }),
            Err(payload) => Err(BindingError::Instantiation {
                name: self.variable_name.clone(),
                reason: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl std::fmt::Debug for BindingDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("variable_name", &self.variable_name)
            .finish_non_exhaustive()
    }
}

/// Host-provided enumeration of binding contributions.
pub trait BindingContributions: Send + Sync {
    fn contributions(&self) -> Vec<BindingDescriptor>;
}

/// Bindings instantiated for one run, in acquisition order with unique names.
#[derive(Debug, Default)]
pub struct LoadedBindings {
    entries: Vec<(String, DomValue)>,
    failures: Vec<BindingError>,
}

impl LoadedBindings {
    pub fn get(&self, name: &str) -> Option<&DomValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Descriptors that failed to instantiate.
    pub fn failures(&self) -> &[BindingError] {
        &self.failures
    }

    /// Split into entries and instantiation failures.
    pub fn into_parts(self) -> (Vec<(String, DomValue)>, Vec<BindingError>) {
        (self.entries, self.failures)
    }
}

/// Registry of binding descriptors and contribution sources.
#[derive(Default)]
pub struct BindingRegistry {
    descriptors: RwLock<Vec<BindingDescriptor>>,
    sources: RwLock<Vec<Arc<dyn BindingContributions>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single descriptor.
    pub fn register(&self, descriptor: BindingDescriptor) {
        self.descriptors.write().push(descriptor);
    }

    /// Register a contribution source, re-enumerated on every load.
    pub fn add_source(&self, source: Arc<dyn BindingContributions>) {
        self.sources.write().push(source);
    }

    /// Current descriptors: registered ones first, then each source in order.
    pub fn descriptors(&self) -> Vec<BindingDescriptor> {
        let mut all = self.descriptors.read().clone();
        let sources: Vec<_> = self.sources.read().iter().cloned().collect();
        for source in sources {
            match panic::catch_unwind(AssertUnwindSafe(|| source.contributions())) {
                Ok(found) => all.extend(found),
                Err(payload) => log::error!(
                    "Binding contribution source failed to enumerate: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
        all
    }

    /// Instantiate every descriptor for one run.
    ///
    /// Failing factories are logged and excluded. On a name collision the
    /// later descriptor wins; the shadowed instance is disposed here because
    /// no run will ever own it.
    pub fn load_bindings(&self) -> LoadedBindings {
        let mut loaded = LoadedBindings::default();

        for descriptor in self.descriptors() {
            let name = descriptor.variable_name.trim().to_string();
            if name.is_empty() {
                log::warn!("Skipping binding descriptor with empty variable name");
                continue;
            }

            let value = match descriptor.instantiate() {
                Ok(Some(value)) => value,
                Ok(None) => {
                    log::warn!("Binding '{}' produced no object, skipping", name);
                    continue;
                }
                Err(err) => {
                    log::error!("Could not load binding: {}", err);
                    loaded.failures.push(err);
                    continue;
                }
            };

            let value = match resolve_delegate(&name, value) {
                Some(value) => value,
                None => {
                    log::warn!("Binding '{}' DOM root is empty, skipping", name);
                    continue;
                }
            };

            if let Some(pos) = loaded.entries.iter().position(|(n, _)| n == &name) {
                log::warn!(
                    "Binding '{}' declared more than once, the later declaration wins",
                    name
                );
                let (_, shadowed) = loaded.entries.remove(pos);
                if let Err(err) = dispose_value(&name, &shadowed) {
                    log::warn!("{}", err);
                }
            }

            log::trace!("Loaded binding '{}' = {:?}", name, value);
            loaded.entries.push((name, value));
        }

        loaded
    }
}

/// Apply the delegation capability once.
fn resolve_delegate(name: &str, value: DomValue) -> Option<DomValue> {
    if let DomValue::Object(obj) = &value {
        let obj = Arc::clone(obj);
        if let Some(factory) = obj.as_dom_factory() {
            log::trace!("Binding '{}' delegates to its DOM root", name);
            return factory.dom_root().filter(|v| !v.is_unit());
        }
    }
    Some(value)
}

/// Invoke the disposal capability of a bound value, if it has one.
///
/// Panics raised by `dispose` are caught and reported like errors.
pub fn dispose_value(name: &str, value: &DomValue) -> Result<bool, BindingError> {
    let DomValue::Object(obj) = value else {
        return Ok(false);
    };
    let Some(disposable) = obj.as_disposable() else {
        return Ok(false);
    };

    match panic::catch_unwind(AssertUnwindSafe(|| disposable.dispose())) {
        Ok(Ok(())) => Ok(true),
        Ok(Err(reason)) => Err(BindingError::Disposal {
            name: name.to_string(),
            reason,
        }),
        Err(payload) => Err(BindingError::Disposal {
            name: name.to_string(),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

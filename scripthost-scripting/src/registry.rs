//! Engine provider registry.
//!
//! Maps provider ids and file extensions to [`ScriptProvider`]s. When two
//! providers claim the same extension the most recently registered one wins;
//! the override is logged as a warning so the conflict is visible.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::NoProviderError;
use crate::provider::{ScriptProvider, normalize_extension};

#[derive(Default)]
struct RegistryInner {
    /// Providers keyed by id.
    by_id: HashMap<String, Arc<dyn ScriptProvider>>,
    /// Lowercase extension (with dot) to provider.
    by_extension: HashMap<String, Arc<dyn ScriptProvider>>,
    /// Ids in registration order.
    order: Vec<String>,
}

/// Registry of installed script providers, safe for concurrent lookup.
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any provider with the same id.
    pub fn register(&self, provider: Arc<dyn ScriptProvider>) {
        let id = provider.id().to_string();
        let mut inner = self.inner.write();

        if inner.by_id.remove(&id).is_some() {
            log::warn!("Script provider '{}' re-registered, replacing previous", id);
            inner.by_extension.retain(|_, p| p.id() != id);
            inner.order.retain(|existing| existing != &id);
        }

        for ext in provider.supported_extensions() {
            let ext = normalize_extension(ext);
            if let Some(previous) = inner.by_extension.insert(ext.clone(), Arc::clone(&provider)) {
                log::warn!(
                    "Extension '{}' claimed by '{}' is now handled by '{}'",
                    ext,
                    previous.id(),
                    id
                );
            }
        }

        log::debug!(
            "Registered script provider '{}' ({:?})",
            id,
            provider.supported_extensions()
        );
        inner.order.push(id.clone());
        inner.by_id.insert(id, provider);
    }

    /// Find the provider for a file by case-normalized suffix match.
    ///
    /// When several registered extensions match, the longest one wins so that
    /// `.lib.rhai` can be owned separately from `.rhai`.
    pub fn resolve_by_extension(
        &self,
        file: impl AsRef<Path>,
    ) -> Result<Arc<dyn ScriptProvider>, NoProviderError> {
        let file = file.as_ref();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let inner = self.inner.read();
        let best = inner
            .by_extension
            .iter()
            .filter(|(ext, _)| name.ends_with(ext.as_str()))
            .max_by_key(|(ext, _)| ext.len());

        if let Some((_, provider)) = best {
            return Ok(Arc::clone(provider));
        }

        match file.extension() {
            Some(ext) => Err(NoProviderError::Extension(format!(
                ".{}",
                ext.to_string_lossy().to_lowercase()
            ))),
            None => Err(NoProviderError::MissingExtension(file.to_path_buf())),
        }
    }

    /// Find a provider by id.
    pub fn resolve_by_id(&self, id: &str) -> Result<Arc<dyn ScriptProvider>, NoProviderError> {
        self.inner
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| NoProviderError::Id(id.to_string()))
    }

    /// Resolve a language hint: a provider id, or an extension with or without dot.
    pub fn resolve_hint(&self, hint: &str) -> Result<Arc<dyn ScriptProvider>, NoProviderError> {
        if let Ok(provider) = self.resolve_by_id(hint) {
            return Ok(provider);
        }
        let ext = normalize_extension(hint);
        self.inner
            .read()
            .by_extension
            .get(&ext)
            .cloned()
            .ok_or(NoProviderError::Extension(ext))
    }

    /// All providers in registration order.
    pub fn all(&self) -> Vec<Arc<dyn ScriptProvider>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    /// Whether any provider owns `file`.
    pub fn handles(&self, file: impl AsRef<Path>) -> bool {
        self.resolve_by_extension(file).is_ok()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

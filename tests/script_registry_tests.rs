//! Integration tests for provider registration and resolution.

mod common;

use std::sync::Arc;

use common::StubProvider;
use scripthost::scripting::ProviderRegistry;
use scripthost::scripting::error::NoProviderError;

fn registry(providers: Vec<StubProvider>) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(Arc::new(provider));
    }
    registry
}

#[test]
fn test_disjoint_extensions_resolve_to_their_owner() {
    let registry = registry(vec![
        StubProvider::new("py", &[".py"]),
        StubProvider::new("js", &[".js", ".mjs"]),
    ]);

    assert_eq!(registry.resolve_by_extension("tool.py").unwrap().id(), "py");
    assert_eq!(registry.resolve_by_extension("app.js").unwrap().id(), "js");
    assert_eq!(registry.resolve_by_extension("dir/mod.mjs").unwrap().id(), "js");
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_unowned_extension_is_no_provider_error() {
    let registry = registry(vec![StubProvider::new("py", &[".py"])]);

    assert_eq!(
        registry.resolve_by_extension("notes.txt").unwrap_err(),
        NoProviderError::Extension(".txt".to_string())
    );
    assert!(matches!(
        registry.resolve_by_extension("Makefile"),
        Err(NoProviderError::MissingExtension(_))
    ));
    assert!(!registry.handles("notes.txt"));
    assert!(registry.handles("tool.py"));
}

#[test]
fn test_extension_match_ignores_case() {
    let registry = registry(vec![StubProvider::new("py", &[".PY"])]);
    assert_eq!(registry.resolve_by_extension("Tool.Py").unwrap().id(), "py");
}

#[test]
fn test_reclaimed_extension_resolves_to_newer_provider() {
    let registry = registry(vec![
        StubProvider::new("old", &[".js"]),
        StubProvider::new("new", &[".js"]),
    ]);

    assert_eq!(registry.resolve_by_extension("a.js").unwrap().id(), "new");
    // The older provider stays reachable by id.
    assert_eq!(registry.resolve_by_id("old").unwrap().id(), "old");
}

#[test]
fn test_reregistered_id_replaces_previous_provider() {
    let registry = registry(vec![
        StubProvider::new("js", &[".js", ".jsx"]),
        StubProvider::new("js", &[".mjs"]),
    ]);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.resolve_by_extension("a.mjs").unwrap().id(), "js");
    // Extensions of the replaced registration are released.
    assert!(registry.resolve_by_extension("a.jsx").is_err());
}

#[test]
fn test_longest_suffix_wins() {
    let registry = registry(vec![
        StubProvider::new("rhai", &[".rhai"]),
        StubProvider::new("lib", &[".lib.rhai"]),
    ]);

    assert_eq!(registry.resolve_by_extension("x.lib.rhai").unwrap().id(), "lib");
    assert_eq!(registry.resolve_by_extension("x.rhai").unwrap().id(), "rhai");
}

#[test]
fn test_resolve_by_id_is_exact() {
    let registry = registry(vec![StubProvider::new("python", &[".py"])]);

    assert!(registry.resolve_by_id("python").is_ok());
    assert_eq!(
        registry.resolve_by_id("py").unwrap_err(),
        NoProviderError::Id("py".to_string())
    );
}

#[test]
fn test_language_hint_accepts_id_or_extension() {
    let registry = registry(vec![StubProvider::new("python", &[".py"])]);

    assert_eq!(registry.resolve_hint("python").unwrap().id(), "python");
    assert_eq!(registry.resolve_hint(".py").unwrap().id(), "python");
    assert_eq!(registry.resolve_hint("PY").unwrap().id(), "python");
    assert!(registry.resolve_hint("ruby").is_err());
}

#[test]
fn test_all_lists_providers_in_registration_order() {
    let registry = registry(vec![
        StubProvider::new("b", &[".b"]),
        StubProvider::new("a", &[".a"]),
    ]);
    let ids: Vec<String> = registry.all().iter().map(|p| p.id().to_string()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

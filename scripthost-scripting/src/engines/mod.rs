//! Built-in script providers.

pub mod command;
#[cfg(feature = "lua")]
pub mod lua_engine;
pub mod rhai_engine;

use std::sync::Arc;

use crate::registry::ProviderRegistry;

pub use command::{CommandProvider, CommandSpec};
#[cfg(feature = "lua")]
pub use lua_engine::LuaProvider;
pub use rhai_engine::RhaiProvider;

/// Register the embedded providers: Rhai always, Lua with the `lua` feature.
pub fn register_builtin_providers(registry: &ProviderRegistry, max_operations: u64) {
    registry.register(Arc::new(
        RhaiProvider::new().with_max_operations(max_operations),
    ));
    #[cfg(feature = "lua")]
    registry.register(Arc::new(LuaProvider::new()));
}

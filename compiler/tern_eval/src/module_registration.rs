//! Module registration for qualified lookups.
//!
//! A `module name { ... }` statement runs its body in a child scope and then
//! registers that scope here under `name`. The expression evaluator resolves
//! `name.member` through [`ModuleRegistry::resolve_qualified`].
//!
//! The registry is shared by every clone of an interpreter, including the
//! clones carried into spawned units of work.

use rustc_hash::FxHashMap;
use tern_ir::Name;

use crate::errors::{unknown_member, unknown_module, RuntimeError};
use crate::shared::SharedMutableRegistry;
use crate::{Scope, Value};

/// Named module scopes.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    modules: SharedMutableRegistry<FxHashMap<Name, Scope>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `scope` under `name`, returning the scope it replaces.
    pub fn register(&self, name: Name, scope: Scope) -> Option<Scope> {
        let previous = self.modules.write().insert(name.clone(), scope);
        if previous.is_some() {
            tracing::debug!(module = %name, "module re-registered; previous scope replaced");
        } else {
            tracing::debug!(module = %name, "module registered");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Option<Scope> {
        self.modules.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Resolve `module.member` against the module's own bindings.
    ///
    /// Names the module body merely inherited from enclosing scopes are not members.
    pub fn resolve_qualified(&self, module: &str, member: &str) -> Result<Value, RuntimeError> {
        let scope = self.lookup(module).ok_or_else(|| unknown_module(module))?;
        scope
            .get_local(member)
            .ok_or_else(|| unknown_member(module, member))
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

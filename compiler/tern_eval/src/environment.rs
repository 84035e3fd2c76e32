//! Environment for variable scoping in the executor.
//!
//! A [`Scope`] is a reference-counted handle: cloning it shares the same
//! bindings, so a spawned unit of work holding a clone reads and writes the
//! same variables as the code that spawned it. Each scope guards its own
//! bindings with a `parking_lot::RwLock`; lookups through the parent chain
//! hold at most one lock at a time.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tern_ir::Name;

use crate::errors::{undefined_name, RuntimeError};
use crate::Value;

/// Bindings of a single scope, kept in creation order.
#[derive(Default)]
struct Bindings {
    /// Name to slot in `entries`.
    index: FxHashMap<Name, usize>,
    entries: Vec<(Name, Value)>,
}

impl Bindings {
    #[inline]
    fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    #[inline]
    fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.index.get(name) {
            Some(&slot) => Some(&mut self.entries[slot].1),
            None => None,
        }
    }

    fn define(&mut self, name: Name, value: Value) {
        if let Some(existing) = self.get_mut(name.as_str()) {
            *existing = value;
            return;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }
}

struct ScopeData {
    bindings: RwLock<Bindings>,
    parent: Option<Scope>,
}

/// A chained, shared, mutable variable environment.
#[derive(Clone)]
pub struct Scope(Arc<ScopeData>);

impl Scope {
    /// Create a root scope with no parent.
    pub fn new() -> Self {
        Scope(Arc::new(ScopeData {
            bindings: RwLock::new(Bindings::default()),
            parent: None,
        }))
    }

    /// Create a scope whose parent is `self`. Used at every block entry.
    #[must_use]
    pub fn new_child(&self) -> Self {
        Scope(Arc::new(ScopeData {
            bindings: RwLock::new(Bindings::default()),
            parent: Some(self.clone()),
        }))
    }

    #[inline]
    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Introduce `name` in this scope, shadowing any outer binding.
    ///
    /// Redefining a name already local to this scope overwrites it in place.
    pub fn define(&self, name: impl Into<Name>, value: Value) {
        self.0.bindings.write().define(name.into(), value);
    }

    /// Look `name` up in this scope, then each parent in order.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.0.bindings.read().get(name) {
                return Ok(value.clone());
            }
            current = scope.parent();
        }
        Err(undefined_name(name))
    }

    /// Overwrite the nearest existing binding of `name`.
    ///
    /// Plain assignment never declares: an unbound name is an error.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(slot) = scope.0.bindings.write().get_mut(name) {
                *slot = value;
                return Ok(());
            }
            current = scope.parent();
        }
        Err(undefined_name(name))
    }

    /// Whether `name` is visible from this scope.
    pub fn contains(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.0.bindings.read().index.contains_key(name) {
                return true;
            }
            current = scope.parent();
        }
        false
    }

    /// Look `name` up in this scope only, ignoring parents.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.bindings.read().get(name).cloned()
    }

    /// Names defined directly in this scope, in creation order.
    pub fn names(&self) -> Vec<Name> {
        self.0
            .bindings
            .read()
            .entries
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of bindings defined directly in this scope.
    pub fn len(&self) -> usize {
        self.0.bindings.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same scope.
    #[inline]
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.0.bindings.read();
        let mut map = f.debug_map();
        for (name, value) in &bindings.entries {
            map.entry(&name.as_str(), value);
        }
        map.finish()
    }
}

//! Merges the variable scopes that apply to a collection into one effective mapping.
//!
//! Precedence, lowest to highest: global, collection, active environment, active collection
//! environment. Absent scopes contribute nothing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::scope::{find_named, VariableScope};
use crate::workspace::Collection;

/// Flat name to value bindings with no memory of which scope a value came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveMapping(BTreeMap<String, String>);

impl EffectiveMapping {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn overlay(&mut self, scope: &VariableScope) {
        self.0
            .extend(scope.variables().iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EffectiveMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        EffectiveMapping(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub fn resolve(
    global: &VariableScope,
    environments: &[VariableScope],
    collection: &Collection,
) -> EffectiveMapping {
    let mut mapping = resolve_global(global);
    mapping.overlay(&collection.variables);

    if let Some(env) = active(environments, collection.active_environment.as_deref()) {
        mapping.overlay(env);
    }
    if let Some(env) = active(
        &collection.environments,
        collection.active_collection_environment.as_deref(),
    ) {
        mapping.overlay(env);
    }

    debug!(
        collection = %collection.name,
        variables = mapping.len(),
        "resolved effective variables"
    );
    mapping
}

/// Bindings when no collection is selected.
pub fn resolve_global(global: &VariableScope) -> EffectiveMapping {
    let mut mapping = EffectiveMapping::default();
    mapping.overlay(global);
    mapping
}

fn active<'a>(scopes: &'a [VariableScope], name: Option<&str>) -> Option<&'a VariableScope> {
    let name = name?;
    let scope = find_named(scopes, name);
    if scope.is_none() {
        debug!(environment = name, "active environment reference does not resolve, ignoring");
    }
    scope
}

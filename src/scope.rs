use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{MateError, Result};

/// Ranked lowest to highest precedence.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Global,
    Collection,
    Environment,
    CollectionEnvironment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableScope {
    pub kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

impl VariableScope {
    fn empty(kind: ScopeKind, name: Option<String>) -> VariableScope {
        VariableScope { kind, name, variables: BTreeMap::new() }
    }

    pub fn global() -> VariableScope {
        VariableScope::empty(ScopeKind::Global, None)
    }

    pub fn collection() -> VariableScope {
        VariableScope::empty(ScopeKind::Collection, None)
    }

    pub fn environment(name: impl Into<String>) -> VariableScope {
        VariableScope::empty(ScopeKind::Environment, Some(name.into()))
    }

    pub fn collection_environment(name: impl Into<String>) -> VariableScope {
        VariableScope::empty(ScopeKind::CollectionEnvironment, Some(name.into()))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Sets a variable, returning the value it replaced.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<Option<String>> {
        validate_variable_name(name)?;
        Ok(self.variables.insert(name.to_string(), value.into()))
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.variables.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub(crate) fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }
}

pub fn validate_variable_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MateError::validation("variable name cannot be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(MateError::validation(format!(
            "variable name '{}' cannot contain whitespace",
            name
        )));
    }
    if name.contains("{{") || name.contains("}}") {
        return Err(MateError::validation(format!(
            "variable name '{}' should not include {{{{ }}}} markers",
            name
        )));
    }
    Ok(())
}

/// Finds a named scope in a list.
pub(crate) fn find_named<'a>(scopes: &'a [VariableScope], name: &str) -> Option<&'a VariableScope> {
    scopes.iter().find(|it| it.name() == Some(name))
}

pub(crate) fn find_named_mut<'a>(
    scopes: &'a mut [VariableScope],
    name: &str,
) -> Option<&'a mut VariableScope> {
    scopes.iter_mut().find(|it| it.name() == Some(name))
}

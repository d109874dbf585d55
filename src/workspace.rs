//! Collections, shared environments and the persisted templates they own.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{MateError, Result};
use crate::http_request::{RequestTemplate, TemplateId};
use crate::resolver::{self, EffectiveMapping};
use crate::scope::{find_named, find_named_mut, VariableScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "VariableScope::collection")]
    pub variables: VariableScope,
    /// Collection environments, private to this collection.
    #[serde(default)]
    pub environments: Vec<VariableScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_collection_environment: Option<String>,
    #[serde(default)]
    pub requests: Vec<RequestTemplate>,
    /// Normalized operation list this collection's spec requests are generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Collection {
        Collection {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            variables: VariableScope::collection(),
            environments: Vec::new(),
            active_environment: None,
            active_collection_environment: None,
            requests: Vec::new(),
            operations_path: None,
            base_url: None,
        }
    }

    pub fn collection_environment(&self, name: &str) -> Option<&VariableScope> {
        find_named(&self.environments, name)
    }

    pub fn collection_environment_mut(&mut self, name: &str) -> Result<&mut VariableScope> {
        find_named_mut(&mut self.environments, name)
            .ok_or_else(|| MateError::not_found("collection environment", name))
    }

    pub fn create_collection_environment(&mut self, name: &str) -> Result<&mut VariableScope> {
        validate_scope_name(name)?;
        if self.collection_environment(name).is_some() {
            return Err(MateError::conflict("collection environment", name));
        }
        self.environments.push(VariableScope::collection_environment(name));
        self.collection_environment_mut(name)
    }

    pub fn delete_collection_environment(&mut self, name: &str) -> Result<VariableScope> {
        let index = self
            .environments
            .iter()
            .position(|it| it.name() == Some(name))
            .ok_or_else(|| MateError::not_found("collection environment", name))?;
        if self.active_collection_environment.as_deref() == Some(name) {
            self.active_collection_environment = None;
        }
        Ok(self.environments.remove(index))
    }

    pub fn rename_collection_environment(&mut self, old: &str, new: &str) -> Result<()> {
        validate_scope_name(new)?;
        if old == new {
            return Err(MateError::validation("new name must be different from old name"));
        }
        if self.collection_environment(new).is_some() {
            return Err(MateError::conflict("collection environment", new));
        }
        self.collection_environment_mut(old)?.name = Some(new.to_string());
        if self.active_collection_environment.as_deref() == Some(old) {
            self.active_collection_environment = Some(new.to_string());
        }
        Ok(())
    }

    pub fn activate_collection_environment(&mut self, name: &str) -> Result<()> {
        if self.collection_environment(name).is_none() {
            return Err(MateError::not_found("collection environment", name));
        }
        self.active_collection_environment = Some(name.to_string());
        Ok(())
    }

    pub fn deactivate_collection_environment(&mut self) {
        self.active_collection_environment = None;
    }

    pub fn request(&self, id: &TemplateId) -> Option<&RequestTemplate> {
        self.requests.iter().find(|it| &it.id == id)
    }

    /// Looks a request up by id first, then by display name.
    pub fn find_request(&self, id_or_name: &str) -> Option<&RequestTemplate> {
        self.requests
            .iter()
            .find(|it| it.id.as_str() == id_or_name)
            .or_else(|| self.requests.iter().find(|it| it.name == id_or_name))
    }

    /// Stores a user-owned template; ephemeral templates only get in through promotion.
    pub fn add_request(&mut self, mut request: RequestTemplate) -> Result<&RequestTemplate> {
        if request.is_ephemeral() {
            return Err(MateError::validation(format!(
                "'{}' is generated from the api description, promote it instead",
                request.name
            )));
        }
        if self.request(&request.id).is_some() {
            return Err(MateError::conflict("request", request.id.as_str()));
        }
        request.collection_id = Some(self.id.clone());
        self.requests.push(request);
        Ok(&self.requests[self.requests.len() - 1])
    }

    pub fn remove_request(&mut self, id: &TemplateId) -> Result<RequestTemplate> {
        let index = self
            .requests
            .iter()
            .position(|it| &it.id == id)
            .ok_or_else(|| MateError::not_found("request", id.as_str()))?;
        Ok(self.requests.remove(index))
    }

    /// Applies `edit` to a copy of the request and stores it only if the edit succeeds.
    ///
    /// The id, owning collection and origin cannot change through an edit; `updated_at` is bumped.
    pub fn update_request<F>(&mut self, id: &TemplateId, edit: F) -> Result<&RequestTemplate>
    where
        F: FnOnce(&mut RequestTemplate) -> Result<()>,
    {
        let index = self
            .requests
            .iter()
            .position(|it| &it.id == id)
            .ok_or_else(|| MateError::not_found("request", id.as_str()))?;

        let mut edited = self.requests[index].clone();
        edit(&mut edited)?;
        if edited.name.trim().is_empty() {
            return Err(MateError::validation("request name cannot be empty"));
        }
        let current = &self.requests[index];
        edited.id = current.id.clone();
        edited.collection_id = current.collection_id.clone();
        edited.origin = current.origin.clone();
        edited.created_at = current.created_at;
        edited.touch();

        self.requests[index] = edited;
        Ok(&self.requests[index])
    }

    pub fn duplicate_request(&mut self, id: &TemplateId) -> Result<&RequestTemplate> {
        let copy = self
            .request(id)
            .ok_or_else(|| MateError::not_found("request", id.as_str()))?
            .duplicate();
        self.add_request(copy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default = "VariableScope::global")]
    pub global: VariableScope,
    /// Environments shared by all collections.
    #[serde(default)]
    pub environments: Vec<VariableScope>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace {
            global: VariableScope::global(),
            environments: Vec::new(),
            collections: Vec::new(),
        }
    }
}

impl Workspace {
    pub fn resolve(&self, collection: &Collection) -> EffectiveMapping {
        resolver::resolve(&self.global, &self.environments, collection)
    }

    /// Looks a collection up by id first, then by name.
    pub fn collection(&self, id_or_name: &str) -> Result<&Collection> {
        self.collection_index(id_or_name).map(|index| &self.collections[index])
    }

    pub fn collection_mut(&mut self, id_or_name: &str) -> Result<&mut Collection> {
        let index = self.collection_index(id_or_name)?;
        Ok(&mut self.collections[index])
    }

    fn collection_index(&self, id_or_name: &str) -> Result<usize> {
        self.collections
            .iter()
            .position(|it| it.id == id_or_name)
            .or_else(|| self.collections.iter().position(|it| it.name == id_or_name))
            .ok_or_else(|| MateError::not_found("collection", id_or_name))
    }

    pub fn add_collection(&mut self, collection: Collection) -> Result<&mut Collection> {
        if self.collections.iter().any(|it| it.name == collection.name) {
            return Err(MateError::conflict("collection", collection.name));
        }
        info!(collection = %collection.name, "collection added");
        self.collections.push(collection);
        let last = self.collections.len() - 1;
        Ok(&mut self.collections[last])
    }

    pub fn environment(&self, name: &str) -> Option<&VariableScope> {
        find_named(&self.environments, name)
    }

    pub fn environment_mut(&mut self, name: &str) -> Result<&mut VariableScope> {
        find_named_mut(&mut self.environments, name)
            .ok_or_else(|| MateError::not_found("environment", name))
    }

    pub fn create_environment(&mut self, name: &str) -> Result<&mut VariableScope> {
        validate_scope_name(name)?;
        if self.environment(name).is_some() {
            return Err(MateError::conflict("environment", name));
        }
        self.environments.push(VariableScope::environment(name));
        self.environment_mut(name)
    }

    /// Removes a shared environment and clears every collection's reference to it.
    pub fn delete_environment(&mut self, name: &str) -> Result<VariableScope> {
        let index = self
            .environments
            .iter()
            .position(|it| it.name() == Some(name))
            .ok_or_else(|| MateError::not_found("environment", name))?;
        for collection in &mut self.collections {
            if collection.active_environment.as_deref() == Some(name) {
                collection.active_environment = None;
            }
        }
        Ok(self.environments.remove(index))
    }

    pub fn rename_environment(&mut self, old: &str, new: &str) -> Result<()> {
        validate_scope_name(new)?;
        if old == new {
            return Err(MateError::validation("new name must be different from old name"));
        }
        if self.environment(new).is_some() {
            return Err(MateError::conflict("environment", new));
        }
        self.environment_mut(old)?.name = Some(new.to_string());
        for collection in &mut self.collections {
            if collection.active_environment.as_deref() == Some(old) {
                collection.active_environment = Some(new.to_string());
            }
        }
        Ok(())
    }

    pub fn activate_environment(&mut self, collection: &str, name: &str) -> Result<()> {
        if self.environment(name).is_none() {
            return Err(MateError::not_found("environment", name));
        }
        self.collection_mut(collection)?.active_environment = Some(name.to_string());
        Ok(())
    }

    pub fn deactivate_environment(&mut self, collection: &str) -> Result<()> {
        self.collection_mut(collection)?.active_environment = None;
        Ok(())
    }
}

fn validate_scope_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MateError::validation("environment name cannot be empty"));
    }
    Ok(())
}

//! Command handlers behind the CLI. Each one loads the workspace, works on it and saves it only
//! when something changed; output is handed back to `main` for printing.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::errors::MateError;
use crate::export::to_curl;
use crate::generator::{generate, operation_keys};
use crate::http_request::{RequestTemplate, TemplateId};
use crate::http_request_executor::{execute_http_request, format_response, validate_method, ExecutionContext};
use crate::injector::{find_unresolved, inject};
use crate::operation::OperationKey;
use crate::reconciler::{link_related, promote, refresh_liveness_in_place, stale};
use crate::store::{load_operations, load_workspace, save_workspace};
use crate::workspace::{Collection, Workspace};

/// Which variable scope a `set`/`unset` targets.
pub struct ScopeTarget<'a> {
    pub collection: Option<&'a str>,
    pub environment: Option<&'a str>,
}

fn open(workspace: &Path) -> Result<Workspace> {
    load_workspace(workspace).with_context(|| format!("while loading workspace {}", workspace.display()))
}

fn save(workspace: &Path, ws: &Workspace) -> Result<()> {
    save_workspace(workspace, ws).with_context(|| format!("while saving workspace {}", workspace.display()))
}

fn missing_operations(collection: &Collection) -> anyhow::Error {
    anyhow!(
        "collection '{}' has no api operations file, run sync with --operations",
        collection.name
    )
}

#[derive(Default)]
struct Reload {
    specs: Vec<RequestTemplate>,
    /// Saved requests that went stale or came back.
    flipped: usize,
}

/// Reads the collection's operations, brings the liveness of its saved requests up to date and
/// generates the spec requests. Without an operations file there are no spec requests.
fn reload(collection: &mut Collection) -> Result<Reload> {
    let Some(path) = collection.operations_path.clone() else {
        return Ok(Reload::default());
    };
    let operations = load_operations(&path)
        .with_context(|| format!("while reading operations of '{}'", collection.name))?;
    let flipped = refresh_liveness_in_place(&mut collection.requests, &operation_keys(&operations));
    let specs = generate(&operations, collection.base_url.as_deref().unwrap_or_default());
    Ok(Reload { specs, flipped })
}

/// Finds a saved request by id or name, or a spec request by its operation key.
fn find_request(collection: &Collection, specs: &[RequestTemplate], request: &str) -> Result<RequestTemplate> {
    if let Some(found) = collection.find_request(request) {
        return Ok(found.clone());
    }
    if let Ok(key) = request.parse::<OperationKey>() {
        if let Some(spec) = specs.iter().find(|it| it.operation_key() == Some(&key)) {
            return Ok(spec.clone());
        }
    }
    Err(anyhow!("request '{}' not found in '{}'", request, collection.name))
}

fn saved_id(collection: &Collection, request: &str) -> Result<TemplateId> {
    collection
        .find_request(request)
        .map(|it| it.id.clone())
        .ok_or_else(|| anyhow!("no saved request '{}' in '{}'", request, collection.name))
}

pub fn new_collection(workspace: &Path, name: &str, operations: Option<PathBuf>, base_url: Option<String>) -> Result<String> {
    let mut ws = open(workspace)?;
    let mut collection = Collection::new(name);
    collection.operations_path = operations;
    collection.base_url = base_url;
    let id = ws.add_collection(collection)?.id.clone();
    save(workspace, &ws)?;
    Ok(id)
}

pub fn variables(workspace: &Path, collection: &str) -> Result<Vec<(String, String)>> {
    let ws = open(workspace)?;
    let mapping = ws.resolve(ws.collection(collection)?);
    Ok(mapping
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

pub fn show_request(workspace: &Path, collection: &str, request: &str, curl: bool) -> Result<String> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    let loaded = reload(target)?;
    let template = find_request(target, &loaded.specs, request)?;
    if loaded.flipped > 0 {
        save(workspace, &ws)?;
    }
    let mapping = ws.resolve(ws.collection(collection)?);

    for name in find_unresolved(&template, &mapping) {
        warn!(request = %template.name, variable = %name, "variable is not defined");
    }
    if !template.is_operation_live() {
        warn!(request = %template.name, "the linked api operation no longer exists");
    }

    let resolved = inject(&template, &mapping);
    if curl {
        return Ok(to_curl(&resolved));
    }
    Ok(render(&resolved))
}

/// `.http` style listing: `#` lines for the name and operation metadata, then the request.
pub fn render(request: &RequestTemplate) -> String {
    let mut lines = vec![format!("# {}", request.name)];
    if !request.description.is_empty() {
        lines.push(format!("# {}", request.description));
    }
    if let Some(key) = request.operation_key() {
        let state = if request.is_operation_live() { "" } else { " (stale)" };
        lines.push(format!("# operation: {}{}", key, state));
    }
    if let Some(details) = &request.details {
        if details.deprecated {
            lines.push("# deprecated".to_string());
        }
        if !details.tags.is_empty() {
            lines.push(format!("# tags: {}", details.tags.join(", ")));
        }
        for parameter in &details.parameters {
            let mut traits = vec![parameter.location.as_str()];
            if let Some(kind) = &parameter.kind {
                traits.push(kind);
            }
            if parameter.required {
                traits.push("required");
            }
            let mut line = format!("# param {} ({})", parameter.name, traits.join(", "));
            if !parameter.description.is_empty() {
                line.push_str(": ");
                line.push_str(&parameter.description);
            }
            lines.push(line);
        }
        if let Some(body) = &details.request_body {
            let mut line = format!("# body {}", body.content_type);
            if body.required {
                line.push_str(" (required)");
            }
            if !body.description.is_empty() {
                line.push_str(": ");
                line.push_str(&body.description);
            }
            lines.push(line);
        }
    }

    lines.push(format!("{} {}", request.method, request.url));
    for header in request.headers.iter() {
        lines.push(format!("{}: {}", header.name, header.value));
    }
    if let Some(body) = &request.body {
        lines.push(String::new());
        lines.push(body.clone());
    }
    lines.join("\n")
}

pub fn run_requests(workspace: &Path, collection: &str, requests: Vec<&String>) -> Result<()> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    let loaded = reload(target)?;

    let templates: Vec<RequestTemplate> = if requests.is_empty() {
        target.requests.clone()
    } else {
        requests
            .into_iter()
            .map(|it| find_request(target, &loaded.specs, it))
            .collect::<Result<_>>()?
    };
    if loaded.flipped > 0 {
        save(workspace, &ws)?;
    }

    let mapping = ws.resolve(ws.collection(collection)?);
    let context = ExecutionContext::new()?;
    for template in &templates {
        println!("### {}", template.name);
        let response = execute_http_request(template, &mapping, &context)?;
        println!("{}\n", format_response(&response));
    }
    Ok(())
}

/// Outcome of a `sync`.
#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    /// Every operation with the number of saved requests linked to it.
    pub specs: Vec<(OperationKey, usize)>,
    /// Saved requests whose operation is gone: name, id and operation.
    pub stale: Vec<(String, TemplateId, OperationKey)>,
    pub flipped: usize,
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (key, saved) in &self.specs {
            writeln!(f, "{:<40} {} saved", key.to_string(), saved)?;
        }
        for (name, id, key) in &self.stale {
            writeln!(f, "stale: {} ({}) -> {}", name, id, key)?;
        }
        if self.flipped > 0 {
            writeln!(f, "{} request(s) changed state", self.flipped)?;
        }
        Ok(())
    }
}

/// Regenerates spec requests and refreshes the staleness of saved copies.
pub fn sync(workspace: &Path, collection: &str, operations: Option<PathBuf>, base_url: Option<String>) -> Result<SyncReport> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    if operations.is_some() {
        target.operations_path = operations;
    }
    if base_url.is_some() {
        target.base_url = base_url;
    }
    if target.operations_path.is_none() {
        return Err(missing_operations(target));
    }

    let loaded = reload(target)?;
    let report = SyncReport {
        specs: loaded
            .specs
            .iter()
            .filter_map(|spec| {
                let key = spec.operation_key()?.clone();
                Some((key, link_related(spec, &target.requests).len()))
            })
            .collect(),
        stale: stale(&target.requests)
            .into_iter()
            .filter_map(|it| Some((it.name.clone(), it.id.clone(), it.operation_key()?.clone())))
            .collect(),
        flipped: loaded.flipped,
    };
    save(workspace, &ws)?;
    Ok(report)
}

pub fn promote_request(workspace: &Path, collection: &str, operation: &str) -> Result<TemplateId> {
    let key: OperationKey = operation.parse()?;
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    if target.operations_path.is_none() {
        return Err(missing_operations(target));
    }
    let loaded = reload(target)?;
    let spec = loaded
        .specs
        .iter()
        .find(|it| it.operation_key() == Some(&key))
        .ok_or_else(|| anyhow!("operation '{}' is not in the api description", key))?;

    let promoted = promote(spec, &target.id);
    let id = target.add_request(promoted)?.id.clone();
    save(workspace, &ws)?;
    Ok(id)
}

/// Changes applied by `add` and `edit`. `None` and empty lists leave a field alone.
#[derive(Debug, Default)]
pub struct RequestEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub body: Option<String>,
    pub clear_body: bool,
    pub headers: Vec<(String, String)>,
    pub remove_headers: Vec<String>,
    pub query: Vec<(String, String)>,
    pub remove_query: Vec<String>,
}

impl RequestEdit {
    fn apply(self, request: &mut RequestTemplate) -> crate::errors::Result<()> {
        if let Some(name) = self.name {
            request.name = name;
        }
        if let Some(description) = self.description {
            request.description = description;
        }
        if let Some(method) = self.method {
            validate_method(&method)?;
            request.method = method.trim().to_ascii_uppercase();
        }
        if let Some(url) = self.url {
            if url.trim().is_empty() {
                return Err(MateError::validation("url cannot be empty"));
            }
            request.url = url;
        }
        if self.clear_body {
            request.body = None;
        }
        if let Some(body) = self.body {
            request.body = Some(body);
        }
        for name in &self.remove_headers {
            request.headers.remove(name);
        }
        for (name, value) in self.headers {
            request.headers.set(name, value);
        }
        for name in &self.remove_query {
            request.remove_query_param(name);
        }
        for (name, value) in &self.query {
            request.set_query_param(name, value);
        }
        Ok(())
    }
}

/// `Name: value` as given on the command line.
pub fn header_arg(text: &str) -> crate::errors::Result<(String, String)> {
    match text.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.trim().to_string())),
        _ => Err(MateError::validation(format!("expected 'Name: value', got '{}'", text))),
    }
}

/// `name=value` as given on the command line; the value is kept raw.
pub fn query_arg(text: &str) -> crate::errors::Result<(String, String)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(MateError::validation(format!("expected 'name=value', got '{}'", text))),
    }
}

pub fn add_request(
    workspace: &Path,
    collection: &str,
    name: &str,
    method: &str,
    url: &str,
    edit: RequestEdit,
) -> Result<TemplateId> {
    validate_method(method)?;
    if name.trim().is_empty() {
        return Err(MateError::validation("request name cannot be empty").into());
    }
    let mut request = RequestTemplate::new(name, method, url);
    edit.apply(&mut request)?;

    let mut ws = open(workspace)?;
    let id = ws.collection_mut(collection)?.add_request(request)?.id.clone();
    save(workspace, &ws)?;
    Ok(id)
}

/// Edits a saved request; spec requests have to be promoted first.
pub fn edit_request(workspace: &Path, collection: &str, request: &str, edit: RequestEdit) -> Result<TemplateId> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    let id = saved_id(target, request)?;
    target.update_request(&id, |it| edit.apply(it))?;
    save(workspace, &ws)?;
    Ok(id)
}

pub fn remove_request(workspace: &Path, collection: &str, request: &str) -> Result<RequestTemplate> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    let id = saved_id(target, request)?;
    let removed = target.remove_request(&id)?;
    save(workspace, &ws)?;
    Ok(removed)
}

pub fn duplicate_request(workspace: &Path, collection: &str, request: &str) -> Result<TemplateId> {
    let mut ws = open(workspace)?;
    let target = ws.collection_mut(collection)?;
    let id = saved_id(target, request)?;
    let copy = target.duplicate_request(&id)?.id.clone();
    save(workspace, &ws)?;
    Ok(copy)
}

pub fn set_variable(workspace: &Path, target: ScopeTarget<'_>, name: &str, value: Option<&str>) -> Result<()> {
    let mut ws = open(workspace)?;
    let scope = match (target.collection, target.environment) {
        (Some(collection), Some(env)) => ws.collection_mut(collection)?.collection_environment_mut(env)?,
        (Some(collection), None) => &mut ws.collection_mut(collection)?.variables,
        (None, Some(env)) => ws.environment_mut(env)?,
        (None, None) => &mut ws.global,
    };
    match value {
        Some(value) => {
            scope.set(name, value)?;
        }
        None => {
            scope
                .remove(name)
                .ok_or_else(|| anyhow!("variable '{}' is not set", name))?;
        }
    }
    save(workspace, &ws)?;
    Ok(())
}

pub enum EnvCommand<'a> {
    Create(&'a str),
    Delete(&'a str),
    Rename(&'a str, &'a str),
    Use(&'a str),
    Clear,
    List,
}

/// Create, delete, rename and list work on the collection's own environments once a collection is
/// given; use and clear switch the collection's shared environment unless `local` is set.
///
/// Only `List` returns lines, the active collection environment marked with `*`.
pub fn environment(workspace: &Path, collection: Option<&str>, local: bool, command: EnvCommand<'_>) -> Result<Vec<String>> {
    let mut ws = open(workspace)?;
    let needs_collection = || anyhow!("--collection is required for this command");
    let listing = matches!(command, EnvCommand::List);
    let mut lines = Vec::new();

    match (command, local) {
        (EnvCommand::Create(name), false) if collection.is_none() => {
            ws.create_environment(name)?;
        }
        (EnvCommand::Delete(name), false) if collection.is_none() => {
            ws.delete_environment(name)?;
        }
        (EnvCommand::Rename(old, new), false) if collection.is_none() => {
            ws.rename_environment(old, new)?;
        }
        (EnvCommand::List, false) if collection.is_none() => {
            lines = ws
                .environments
                .iter()
                .map(|env| env.name().unwrap_or_default().to_string())
                .collect();
        }
        (EnvCommand::Use(name), false) => {
            ws.activate_environment(collection.ok_or_else(needs_collection)?, name)?;
        }
        (EnvCommand::Clear, false) => {
            ws.deactivate_environment(collection.ok_or_else(needs_collection)?)?;
        }
        (command, _) => {
            let target = ws.collection_mut(collection.ok_or_else(needs_collection)?)?;
            match command {
                EnvCommand::Create(name) => {
                    target.create_collection_environment(name)?;
                }
                EnvCommand::Delete(name) => {
                    target.delete_collection_environment(name)?;
                }
                EnvCommand::Rename(old, new) => target.rename_collection_environment(old, new)?,
                EnvCommand::Use(name) => target.activate_collection_environment(name)?,
                EnvCommand::Clear => target.deactivate_collection_environment(),
                EnvCommand::List => {
                    lines = target
                        .environments
                        .iter()
                        .map(|env| {
                            let active = env.name() == target.active_collection_environment.as_deref();
                            format!("{}{}", env.name().unwrap_or_default(), if active { " *" } else { "" })
                        })
                        .collect();
                }
            }
        }
    }
    if !listing {
        save(workspace, &ws)?;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_request::RequestOrigin;
    use pretty_assertions::assert_eq;
    use std::fs;
    use test_case::test_case;

    const PETS: &str = r#"[
      {"method": "GET", "path": "/pets", "summary": "List pets", "tags": ["pets"],
       "parameters": [{"name": "limit", "in": "query", "type": "integer", "default": 20,
                       "description": "page size"}]},
      {"method": "GET", "path": "/pets/{id}", "summary": "Show pet", "deprecated": true,
       "parameters": [{"name": "id", "in": "path", "required": true, "type": "string"}]}
    ]"#;

    const ONLY_LIST: &str = r#"[{"method": "GET", "path": "/pets", "summary": "List pets"}]"#;

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: PathBuf,
        operations: PathBuf,
    }

    impl Fixture {
        /// A workspace with collection `pets` generated from `PETS`.
        fn new() -> Fixture {
            let dir = tempfile::tempdir().unwrap();
            let workspace = dir.path().join("httpmate.json");
            let operations = dir.path().join("ops.json");
            fs::write(&operations, PETS).unwrap();
            new_collection(
                &workspace,
                "pets",
                Some(operations.clone()),
                Some("https://{{host}}".to_string()),
            )
            .unwrap();
            Fixture { _dir: dir, workspace, operations }
        }

        fn rewrite_operations(&self, content: &str) {
            fs::write(&self.operations, content).unwrap();
        }

        fn load(&self) -> Workspace {
            load_workspace(&self.workspace).unwrap()
        }

        fn saved(&self) -> Vec<RequestTemplate> {
            self.load().collection("pets").unwrap().requests.clone()
        }
    }

    #[test]
    fn promoting_marks_copies_of_removed_operations_stale() {
        let fx = Fixture::new();
        let show = promote_request(&fx.workspace, "pets", "GET /pets/{id}").unwrap();

        fx.rewrite_operations(ONLY_LIST);
        let list = promote_request(&fx.workspace, "pets", "GET /pets").unwrap();

        let ws = fx.load();
        let collection = ws.collection("pets").unwrap();
        assert!(!collection.request(&show).unwrap().is_operation_live());
        assert!(collection.request(&list).unwrap().is_operation_live());
    }

    #[test]
    fn showing_a_request_refreshes_liveness() {
        let fx = Fixture::new();
        let id = promote_request(&fx.workspace, "pets", "GET /pets/{id}").unwrap();
        fx.rewrite_operations(ONLY_LIST);

        let text = show_request(&fx.workspace, "pets", id.as_str(), false).unwrap();
        assert!(text.contains("# operation: GET /pets/{id} (stale)"));

        let saved = fx.saved();
        assert_eq!(
            saved[0].origin,
            RequestOrigin::PersistedLinked { key: OperationKey::new("GET", "/pets/{id}"), live: false }
        );
    }

    #[test]
    fn sync_reports_saved_copies_and_stale_requests() {
        let fx = Fixture::new();
        promote_request(&fx.workspace, "pets", "GET /pets").unwrap();
        promote_request(&fx.workspace, "pets", "GET /pets").unwrap();
        let show = promote_request(&fx.workspace, "pets", "GET /pets/{id}").unwrap();

        fx.rewrite_operations(ONLY_LIST);
        let report = sync(&fx.workspace, "pets", None, None).unwrap();
        assert_eq!(report.specs, vec![(OperationKey::new("GET", "/pets"), 2)]);
        assert_eq!(
            report.stale,
            vec![("Show pet".to_string(), show.clone(), OperationKey::new("GET", "/pets/{id}"))]
        );
        assert_eq!(report.flipped, 1);
        assert!(report.to_string().contains("stale: Show pet"));
        assert_eq!(stale(&fx.saved()).len(), 1);

        fx.rewrite_operations(PETS);
        let report = sync(&fx.workspace, "pets", None, None).unwrap();
        assert!(report.stale.is_empty());
        assert_eq!(report.flipped, 1);
        assert_eq!(report.specs[1], (OperationKey::new("GET", "/pets/{id}"), 1));
    }

    #[test]
    fn sync_can_point_to_another_operations_file() {
        let fx = Fixture::new();
        let other = fx.operations.with_file_name("v2.json");
        fs::write(&other, ONLY_LIST).unwrap();

        let report = sync(&fx.workspace, "pets", Some(other.clone()), Some("http://local".to_string())).unwrap();
        assert_eq!(report.specs.len(), 1);

        let ws = fx.load();
        let collection = ws.collection("pets").unwrap();
        assert_eq!(collection.operations_path.as_deref(), Some(other.as_path()));
        assert_eq!(collection.base_url.as_deref(), Some("http://local"));
    }

    #[test]
    fn collections_without_operations_cannot_sync_or_promote() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("httpmate.json");
        new_collection(&workspace, "bare", None, None).unwrap();
        assert!(sync(&workspace, "bare", None, None).is_err());
        assert!(promote_request(&workspace, "bare", "GET /pets").is_err());
    }

    #[test]
    fn operations_without_method_do_not_break_the_workspace() {
        let fx = Fixture::new();
        fx.rewrite_operations(r#"[{"method": "", "path": "/pets"}, {"method": "GET", "path": "/pets"}]"#);

        assert!(promote_request(&fx.workspace, "pets", " /pets").is_err());
        let id = promote_request(&fx.workspace, "pets", "GET /pets").unwrap();
        let report = sync(&fx.workspace, "pets", None, None).unwrap();
        assert_eq!(report.specs, vec![(OperationKey::new("GET", "/pets"), 1)]);
        assert!(fx.load().collection("pets").unwrap().request(&id).is_some());
    }

    #[test]
    fn show_falls_back_to_operation_key() {
        let fx = Fixture::new();
        let global = ScopeTarget { collection: None, environment: None };
        set_variable(&fx.workspace, global, "host", Some("api.local")).unwrap();

        let text = show_request(&fx.workspace, "pets", "GET /pets", false).unwrap();
        assert!(text.contains("# tags: pets"));
        assert!(text.contains("# param limit (query, integer): page size"));
        assert!(text.ends_with("GET https://api.local/pets?limit=20"));

        let text = show_request(&fx.workspace, "pets", "get /pets/{id}", false).unwrap();
        assert!(text.contains("# deprecated"));
        assert!(text.contains("# param id (path, string, required)"));

        let curl = show_request(&fx.workspace, "pets", "GET /pets/{id}", true).unwrap();
        assert_eq!(curl, "curl 'https://api.local/pets/{{id}}'");

        assert!(show_request(&fx.workspace, "pets", "DELETE /pets", false).is_err());
        assert!(show_request(&fx.workspace, "pets", "nothing", false).is_err());
        assert!(fx.saved().is_empty());
    }

    #[test]
    fn saved_requests_win_over_spec_requests() {
        let fx = Fixture::new();
        let id = promote_request(&fx.workspace, "pets", "GET /pets").unwrap();
        edit_request(
            &fx.workspace,
            "pets",
            id.as_str(),
            RequestEdit { name: Some("GET /pets".to_string()), url: Some("https://mine/pets".to_string()), ..RequestEdit::default() },
        )
        .unwrap();
        let text = show_request(&fx.workspace, "pets", "GET /pets", false).unwrap();
        assert!(text.ends_with("GET https://mine/pets"));
    }

    #[test_case(None, None, "global" ; "global")]
    #[test_case(Some("pets"), None, "collection" ; "collection")]
    #[test_case(None, Some("dev"), "environment" ; "shared environment")]
    #[test_case(Some("pets"), Some("mine"), "collection environment" ; "collection environment")]
    fn set_variable_targets_one_scope(in_collection: Option<&str>, in_env: Option<&str>, expected: &str) {
        let fx = Fixture::new();
        environment(&fx.workspace, None, false, EnvCommand::Create("dev")).unwrap();
        environment(&fx.workspace, Some("pets"), true, EnvCommand::Create("mine")).unwrap();

        let target = ScopeTarget { collection: in_collection, environment: in_env };
        set_variable(&fx.workspace, target, "host", Some("x")).unwrap();

        let ws = fx.load();
        let collection = ws.collection("pets").unwrap();
        let holders: Vec<&str> = [
            ("global", &ws.global),
            ("collection", &collection.variables),
            ("environment", ws.environment("dev").unwrap()),
            ("collection environment", collection.collection_environment("mine").unwrap()),
        ]
        .into_iter()
        .filter(|(_, scope)| scope.get("host").is_some())
        .map(|(name, _)| name)
        .collect();
        assert_eq!(holders, vec![expected]);
    }

    #[test]
    fn unset_removes_and_complains_when_missing() {
        let fx = Fixture::new();
        let target = || ScopeTarget { collection: Some("pets"), environment: None };
        set_variable(&fx.workspace, target(), "token", Some("abc")).unwrap();
        set_variable(&fx.workspace, target(), "token", None).unwrap();
        assert!(fx.load().collection("pets").unwrap().variables.is_empty());
        assert!(set_variable(&fx.workspace, target(), "token", None).is_err());
        assert!(set_variable(&fx.workspace, target(), "bad name", Some("x")).is_err());
    }

    #[test]
    fn environment_commands_pick_shared_or_collection_scope() {
        let fx = Fixture::new();
        environment(&fx.workspace, None, false, EnvCommand::Create("dev")).unwrap();
        environment(&fx.workspace, Some("pets"), true, EnvCommand::Create("mine")).unwrap();
        environment(&fx.workspace, Some("pets"), false, EnvCommand::Use("dev")).unwrap();
        environment(&fx.workspace, Some("pets"), true, EnvCommand::Use("mine")).unwrap();
        assert!(environment(&fx.workspace, None, false, EnvCommand::Use("dev")).is_err());
        assert!(environment(&fx.workspace, None, true, EnvCommand::Create("x")).is_err());

        let ws = fx.load();
        let collection = ws.collection("pets").unwrap();
        assert_eq!(ws.environments.len(), 1);
        assert_eq!(collection.environments.len(), 1);
        assert_eq!(collection.active_environment.as_deref(), Some("dev"));
        assert_eq!(collection.active_collection_environment.as_deref(), Some("mine"));

        assert_eq!(environment(&fx.workspace, None, false, EnvCommand::List).unwrap(), vec!["dev"]);
        assert_eq!(
            environment(&fx.workspace, Some("pets"), true, EnvCommand::List).unwrap(),
            vec!["mine *"]
        );

        environment(&fx.workspace, Some("pets"), false, EnvCommand::Clear).unwrap();
        environment(&fx.workspace, None, false, EnvCommand::Rename("dev", "development")).unwrap();
        environment(&fx.workspace, Some("pets"), true, EnvCommand::Delete("mine")).unwrap();

        let ws = fx.load();
        let collection = ws.collection("pets").unwrap();
        assert!(collection.active_environment.is_none());
        assert!(collection.active_collection_environment.is_none());
        assert!(ws.environment("development").is_some());
    }

    #[test]
    fn listing_environments_does_not_write_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpmate.json");
        assert!(environment(&path, None, false, EnvCommand::List).unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn requests_are_added_edited_duplicated_and_removed() {
        let fx = Fixture::new();
        let id = add_request(
            &fx.workspace,
            "pets",
            "mine",
            "get",
            "https://{{host}}/pets",
            RequestEdit {
                headers: vec![("Accept".to_string(), "application/json".to_string())],
                query: vec![("limit".to_string(), "{{limit}}".to_string())],
                ..RequestEdit::default()
            },
        )
        .unwrap();

        let saved = fx.saved();
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].method, "GET");
        assert_eq!(saved[0].url, "https://{{host}}/pets?limit={{limit}}");
        assert_eq!(saved[0].headers.get("accept"), Some("application/json"));
        assert_eq!(saved[0].origin, RequestOrigin::Persisted);

        edit_request(
            &fx.workspace,
            "pets",
            "mine",
            RequestEdit {
                name: Some("all pets".to_string()),
                method: Some("post".to_string()),
                body: Some("{}".to_string()),
                remove_headers: vec!["accept".to_string()],
                remove_query: vec!["limit".to_string()],
                ..RequestEdit::default()
            },
        )
        .unwrap();

        let saved = fx.saved();
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].name, "all pets");
        assert_eq!(saved[0].method, "POST");
        assert_eq!(saved[0].url, "https://{{host}}/pets");
        assert_eq!(saved[0].body.as_deref(), Some("{}"));
        assert!(saved[0].headers.is_empty());
        assert!(saved[0].updated_at >= saved[0].created_at);

        let copy = duplicate_request(&fx.workspace, "pets", "all pets").unwrap();
        assert_ne!(copy, id);
        assert_eq!(fx.saved().len(), 2);

        let removed = remove_request(&fx.workspace, "pets", id.as_str()).unwrap();
        assert_eq!(removed.name, "all pets");
        let saved = fx.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, copy);
        assert_eq!(saved[0].name, "all pets (Copy)");
    }

    #[test]
    fn invalid_edits_are_rejected_and_not_saved() {
        let fx = Fixture::new();
        assert!(add_request(&fx.workspace, "pets", "x", "FETCH", "https://x", RequestEdit::default()).is_err());
        assert!(add_request(&fx.workspace, "pets", " ", "GET", "https://x", RequestEdit::default()).is_err());
        add_request(&fx.workspace, "pets", "mine", "GET", "https://x", RequestEdit::default()).unwrap();

        let bad_method = RequestEdit { method: Some("FETCH".to_string()), ..RequestEdit::default() };
        assert!(edit_request(&fx.workspace, "pets", "mine", bad_method).is_err());
        let empty_url = RequestEdit { url: Some(" ".to_string()), ..RequestEdit::default() };
        assert!(edit_request(&fx.workspace, "pets", "mine", empty_url).is_err());
        assert!(edit_request(&fx.workspace, "pets", "GET /pets", RequestEdit::default()).is_err());
        assert!(remove_request(&fx.workspace, "pets", "GET /pets").is_err());

        let saved = fx.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].method, "GET");
        assert_eq!(saved[0].url, "https://x");
    }

    #[test]
    fn edited_promoted_requests_keep_link_and_details() {
        let fx = Fixture::new();
        let id = promote_request(&fx.workspace, "pets", "GET /pets").unwrap();
        edit_request(
            &fx.workspace,
            "pets",
            id.as_str(),
            RequestEdit { clear_body: true, query: vec![("limit".to_string(), "5".to_string())], ..RequestEdit::default() },
        )
        .unwrap();

        let saved = fx.saved();
        assert_eq!(saved[0].url, "https://{{host}}/pets?limit=5");
        assert_eq!(saved[0].operation_key(), Some(&OperationKey::new("GET", "/pets")));
        assert_eq!(saved[0].details.as_ref().unwrap().tags, vec!["pets"]);

        let text = show_request(&fx.workspace, "pets", "List pets", false).unwrap();
        assert!(text.contains("# operation: GET /pets"));
        assert!(text.contains("# tags: pets"));
    }

    #[test_case("Accept: application/json", Some(("Accept", "application/json")) ; "header")]
    #[test_case("X-Url: http://a:1", Some(("X-Url", "http://a:1")) ; "colon in value")]
    #[test_case(": nameless", None ; "no name")]
    #[test_case("no separator", None ; "no separator")]
    fn parses_header_args(text: &str, expected: Option<(&str, &str)>) {
        let parsed = header_arg(text).ok();
        let expected = expected.map(|(name, value)| (name.to_string(), value.to_string()));
        assert_eq!(parsed, expected);
    }

    #[test_case("limit=20", Some(("limit", "20")) ; "pair")]
    #[test_case("q={{term}}", Some(("q", "{{term}}")) ; "placeholder value")]
    #[test_case("flag=", Some(("flag", "")) ; "empty value")]
    #[test_case("=x", None ; "no name")]
    fn parses_query_args(text: &str, expected: Option<(&str, &str)>) {
        let parsed = query_arg(text).ok();
        let expected = expected.map(|(name, value)| (name.to_string(), value.to_string()));
        assert_eq!(parsed, expected);
    }
}

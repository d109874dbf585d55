use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::operation::{OperationDetails, OperationKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn generate() -> TemplateId {
        TemplateId(uuid::Uuid::new_v4().to_string())
    }

    /// Ephemeral templates get an id derived from their operation so regeneration is stable.
    pub fn for_operation(key: &OperationKey) -> TemplateId {
        TemplateId(format!("spec:{}", key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TemplateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(value: &str) -> Self {
        TemplateId(value.to_string())
    }
}

/// Where a template came from and how it relates to the API description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestOrigin {
    /// User owned, not linked to any operation.
    Persisted,
    /// User owned and linked to an operation; `live` is false once the operation disappeared.
    PersistedLinked { key: OperationKey, live: bool },
    /// Generated from the current description, never stored as-is.
    Ephemeral { key: OperationKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Header list; names compare case-insensitively but keep their original spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Headers {
        Headers(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|it| it.name.eq_ignore_ascii_case(name))
            .map(|it| it.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the value of an existing header (keeping its spelling) or appends a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|it| it.name.eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.value = value,
            None => self.0.push(Header { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|it| it.name.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Header> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    pub origin: RequestOrigin,
    /// Description metadata of the linked operation, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<OperationDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RequestTemplate {
    /// A new user-owned template without any operation link.
    pub fn new(name: impl Into<String>, method: &str, url: impl Into<String>) -> RequestTemplate {
        let now = Utc::now();
        RequestTemplate {
            id: TemplateId::generate(),
            name: name.into(),
            description: String::new(),
            method: method.trim().to_ascii_uppercase(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
            collection_id: None,
            origin: RequestOrigin::Persisted,
            details: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub(crate) fn ephemeral(key: OperationKey, name: String, url: String) -> RequestTemplate {
        RequestTemplate {
            id: TemplateId::for_operation(&key),
            name,
            description: String::new(),
            method: key.method().to_string(),
            url,
            headers: Headers::new(),
            body: None,
            collection_id: None,
            origin: RequestOrigin::Ephemeral { key },
            details: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_operation(mut self, key: OperationKey) -> Self {
        self.origin = RequestOrigin::PersistedLinked { key, live: true };
        self
    }

    pub fn operation_key(&self) -> Option<&OperationKey> {
        match &self.origin {
            RequestOrigin::Persisted => None,
            RequestOrigin::PersistedLinked { key, .. } | RequestOrigin::Ephemeral { key } => Some(key),
        }
    }

    /// Unlinked and ephemeral templates always count as live.
    pub fn is_operation_live(&self) -> bool {
        match self.origin {
            RequestOrigin::PersistedLinked { live, .. } => live,
            _ => true,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self.origin, RequestOrigin::Ephemeral { .. })
    }

    pub fn is_persisted(&self) -> bool {
        !self.is_ephemeral()
    }

    /// Independent persisted copy with a fresh id; an operation link is kept.
    pub fn duplicate(&self) -> RequestTemplate {
        let now = Utc::now();
        let origin = match &self.origin {
            RequestOrigin::Persisted => RequestOrigin::Persisted,
            RequestOrigin::PersistedLinked { key, live } => RequestOrigin::PersistedLinked {
                key: key.clone(),
                live: *live,
            },
            RequestOrigin::Ephemeral { key } => RequestOrigin::PersistedLinked {
                key: key.clone(),
                live: true,
            },
        };
        RequestTemplate {
            id: TemplateId::generate(),
            name: format!("{} (Copy)", self.name),
            origin,
            created_at: Some(now),
            updated_at: Some(now),
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        if self.is_persisted() {
            self.updated_at = Some(Utc::now());
        }
    }

    /// Query pairs of the url as written, without decoding.
    pub fn query_params(&self) -> Vec<(&str, &str)> {
        match self.url.split_once('?') {
            Some((_, query)) => query
                .split('&')
                .filter(|it| !it.is_empty())
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .collect(),
            None => vec![],
        }
    }

    /// Replaces every pair named `name` with a single `name=value` at the first position, or appends one.
    /// Values are kept raw so `{{placeholders}}` stay injectable.
    pub fn set_query_param(&mut self, name: &str, value: &str) {
        let (base, mut pairs) = self.split_query();
        let pair = format!("{}={}", name, value);
        match pairs.iter().position(|it| pair_name(it) == name) {
            Some(index) => {
                pairs[index] = pair;
                let mut seen = false;
                pairs.retain(|it| {
                    if pair_name(it) != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => pairs.push(pair),
        }
        self.url = join_query(base, &pairs);
    }

    /// Drops every pair named `name`; returns whether anything was removed.
    pub fn remove_query_param(&mut self, name: &str) -> bool {
        let (base, mut pairs) = self.split_query();
        let before = pairs.len();
        pairs.retain(|it| pair_name(it) != name);
        let removed = pairs.len() != before;
        self.url = join_query(base, &pairs);
        removed
    }

    fn split_query(&self) -> (String, Vec<String>) {
        match self.url.split_once('?') {
            Some((base, query)) => (
                base.to_string(),
                query
                    .split('&')
                    .filter(|it| !it.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => (self.url.clone(), vec![]),
        }
    }
}

fn pair_name(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(name, _)| name)
}

fn join_query(base: String, pairs: &[String]) -> String {
    if pairs.is_empty() {
        base
    } else {
        format!("{}?{}", base, pairs.join("&"))
    }
}

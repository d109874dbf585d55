//! Normalized API description operations as handed over by the description parser.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MateError;

/// Identifies one operation of an API description across reloads: `(METHOD, path pattern)`.
///
/// The method is stored upper case, the path exactly as written including `{param}` segments.
/// The textual form is `"GET /pets/{id}"`; stored workspaces keep both parts as separate fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    method: String,
    path: String,
}

impl OperationKey {
    pub fn new(method: &str, path: &str) -> OperationKey {
        OperationKey {
            method: method.trim().to_ascii_uppercase(),
            path: path.trim().to_string(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for OperationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for OperationKey {
    type Err = MateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(' ') {
            Some((method, path)) if !method.is_empty() && !path.trim().is_empty() => {
                Ok(OperationKey::new(method, path))
            }
            _ => Err(MateError::InvalidOperationKey(s.to_string())),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Value chosen for a parameter when a request is generated from its operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Taken from the description (example, default or first enum value).
    Literal(String),
    /// Nothing usable was declared, a `{{name}}` placeholder stands in.
    Placeholder(String),
}

impl ParameterValue {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterValue::Literal(value) | ParameterValue::Placeholder(value) => value,
        }
    }
}

impl Parameter {
    /// Example, then default, then the first enum value of a string parameter, then a placeholder.
    pub fn sample_value(&self) -> ParameterValue {
        if let Some(example) = &self.example {
            return ParameterValue::Literal(value_text(example));
        }
        if let Some(default) = &self.default {
            return ParameterValue::Literal(value_text(default));
        }
        if self.kind.as_deref() == Some("string") {
            if let Some(first) = self.enum_values.first() {
                return ParameterValue::Literal(value_text(first));
            }
        }
        ParameterValue::Placeholder(format!("{{{{{}}}}}", self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExample {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<NamedExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_example: Option<Value>,
}

impl RequestBody {
    pub fn is_json(&self) -> bool {
        let media_type = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        media_type == "application/json" || media_type.ends_with("+json")
    }

    /// The body's own example, then its first keyed example, then the schema example.
    pub fn first_example(&self) -> Option<&Value> {
        self.example
            .as_ref()
            .or_else(|| self.examples.first().map(|it| &it.value))
            .or(self.schema_example.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOperation {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
}

impl NormalizedOperation {
    pub fn key(&self) -> OperationKey {
        OperationKey::new(&self.method, &self.path)
    }

    /// A single-token method and a non-empty path; anything else cannot be keyed reliably.
    pub fn is_addressable(&self) -> bool {
        let method = self.method.trim();
        !method.is_empty() && !method.contains(char::is_whitespace) && !self.path.trim().is_empty()
    }

    pub fn details(&self) -> OperationDetails {
        OperationDetails {
            tags: self.tags.clone(),
            deprecated: self.deprecated,
            parameters: self
                .parameters
                .iter()
                .map(|it| ParameterDetail {
                    name: it.name.clone(),
                    location: it.location,
                    required: it.required,
                    kind: it.kind.clone(),
                    description: it.description.clone(),
                })
                .collect(),
            request_body: self.request_body.as_ref().map(|it| BodyDetail {
                content_type: it.content_type.clone(),
                required: it.required,
                description: it.description.clone(),
            }),
        }
    }
}

/// Description metadata kept on generated requests (and their promoted copies) for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodyDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDetail {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyDetail {
    pub content_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

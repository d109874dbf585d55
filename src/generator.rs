//! Turns normalized API description operations into ephemeral request templates.

use std::collections::{BTreeSet, HashMap};

use tracing::{info, warn};

use crate::http_request::RequestTemplate;
use crate::operation::{NormalizedOperation, OperationKey, ParameterLocation, ParameterValue};

const CONTENT_TYPE: &str = "Content-Type";
const JSON: &str = "application/json";

/// One ephemeral template per distinct operation key.
///
/// When the same key occurs more than once the last operation wins but keeps the position of
/// the first occurrence, so output order follows the description.
pub fn generate(operations: &[NormalizedOperation], base_url: &str) -> Vec<RequestTemplate> {
    let mut templates: Vec<RequestTemplate> = Vec::with_capacity(operations.len());
    let mut positions: HashMap<OperationKey, usize> = HashMap::new();

    for operation in operations {
        if !operation.is_addressable() {
            warn!(method = %operation.method, path = %operation.path, "skipping operation without a usable method and path");
            continue;
        }
        let template = generate_one(operation, base_url);
        let key = operation.key();
        match positions.get(&key) {
            Some(&index) => {
                warn!(operation = %key, "duplicate operation in api description, keeping the last one");
                templates[index] = template;
            }
            None => {
                positions.insert(key, templates.len());
                templates.push(template);
            }
        }
    }

    info!(operations = operations.len(), requests = templates.len(), "generated spec requests");
    templates
}

pub fn generate_one(operation: &NormalizedOperation, base_url: &str) -> RequestTemplate {
    let key = operation.key();
    let base = if operation.base_url.trim().is_empty() {
        base_url
    } else {
        operation.base_url.as_str()
    };

    let mut url = format!("{}{}", base.trim_end_matches('/'), operation.path);
    let mut query: Vec<String> = Vec::new();
    let mut headers: Vec<(String, String)> = Vec::new();

    for parameter in &operation.parameters {
        let value = parameter.sample_value();
        match parameter.location {
            ParameterLocation::Path => {
                url = url.replace(&format!("{{{}}}", parameter.name), value.as_str());
            }
            ParameterLocation::Query => query.push(query_pair(&parameter.name, &value)),
            ParameterLocation::Header => headers.push((parameter.name.clone(), value.as_str().to_string())),
        }
    }

    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query.join("&"));
    }

    let name = if operation.summary.trim().is_empty() {
        key.to_string()
    } else {
        operation.summary.clone()
    };

    let mut template = RequestTemplate::ephemeral(key, name, url);
    template.description = operation.description.clone();
    template.details = Some(operation.details());
    for (name, value) in headers {
        template.headers.set(name, value);
    }

    if let Some(body) = example_body(operation) {
        if !template.headers.contains(CONTENT_TYPE) {
            template.headers.set(CONTENT_TYPE, JSON);
        }
        template.body = Some(body);
    }
    template
}

/// The set of keys present in the current description; unaddressable operations are left out.
pub fn operation_keys(operations: &[NormalizedOperation]) -> BTreeSet<OperationKey> {
    operations
        .iter()
        .filter(|it| it.is_addressable())
        .map(NormalizedOperation::key)
        .collect()
}

pub fn contains_operation(operations: &[NormalizedOperation], key: &OperationKey) -> bool {
    operations.iter().any(|it| it.is_addressable() && &it.key() == key)
}

fn example_body(operation: &NormalizedOperation) -> Option<String> {
    let body = operation.request_body.as_ref().filter(|it| it.is_json())?;
    body.first_example().map(|example| example.to_string())
}

/// Literal values are form encoded; placeholders stay raw so they can still be injected.
fn query_pair(name: &str, value: &ParameterValue) -> String {
    let name: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    match value {
        ParameterValue::Literal(text) => {
            let text: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
            format!("{}={}", name, text)
        }
        ParameterValue::Placeholder(placeholder) => format!("{}={}", name, placeholder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_request::RequestOrigin;
    use crate::operation::{NamedExample, Parameter, RequestBody};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn parameter(name: &str, location: ParameterLocation) -> Parameter {
        Parameter {
            name: name.to_string(),
            location,
            required: true,
            kind: Some("string".to_string()),
            example: None,
            default: None,
            enum_values: vec![],
            description: String::new(),
        }
    }

    fn operation(method: &str, path: &str) -> NormalizedOperation {
        NormalizedOperation {
            method: method.to_string(),
            path: path.to_string(),
            base_url: String::new(),
            summary: String::new(),
            description: String::new(),
            tags: vec![],
            deprecated: false,
            parameters: vec![],
            request_body: None,
        }
    }

    fn json_body(example: Option<Value>, examples: Vec<NamedExample>, schema: Option<Value>) -> RequestBody {
        RequestBody {
            required: true,
            content_type: JSON.to_string(),
            description: String::new(),
            example,
            examples,
            schema_example: schema,
        }
    }

    fn petstore() -> Vec<NormalizedOperation> {
        let mut list = operation("get", "/pets");
        list.summary = "List pets".to_string();
        let mut limit = parameter("limit", ParameterLocation::Query);
        limit.kind = Some("integer".to_string());
        limit.default = Some(json!(20));
        let mut status = parameter("status", ParameterLocation::Query);
        status.enum_values = vec![json!("available"), json!("sold")];
        let mut tag = parameter("tag", ParameterLocation::Query);
        tag.example = Some(json!("good boy"));
        list.parameters = vec![limit, status, tag];

        let mut create = operation("POST", "/pets");
        create.summary = "Create a pet".to_string();
        create.request_body = Some(json_body(
            None,
            vec![NamedExample { name: "fluffy".to_string(), value: json!({"name": "Fluffy"}) }],
            Some(json!({"name": "Schema"})),
        ));

        let mut show = operation("GET", "/pets/{petId}");
        let mut pet_id = parameter("petId", ParameterLocation::Path);
        pet_id.default = Some(json!("pet-001"));
        show.parameters = vec![pet_id, parameter("X-Request-Id", ParameterLocation::Header)];

        let mut delete = operation("DELETE", "/pets/{petId}");
        delete.parameters = vec![parameter("petId", ParameterLocation::Path)];

        vec![list, create, show, delete]
    }

    const BASE: &str = "https://petstore.example/v2/";

    #[test]
    fn every_template_is_ephemeral_and_live() {
        let templates = generate(&petstore(), BASE);
        assert_eq!(templates.len(), 4);
        for template in &templates {
            assert!(template.is_ephemeral());
            assert!(template.is_operation_live());
            assert!(template.url.starts_with("https://petstore.example/v2/pets"));
        }
        let keys: Vec<String> = templates
            .iter()
            .map(|it| it.operation_key().unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            vec!["GET /pets", "POST /pets", "GET /pets/{petId}", "DELETE /pets/{petId}"]
        );
    }

    #[test]
    fn regeneration_is_idempotent() {
        assert_eq!(generate(&petstore(), BASE), generate(&petstore(), BASE));
    }

    #[test]
    fn query_parameters_follow_value_priority() {
        let templates = generate(&petstore(), BASE);
        assert_eq!(templates[0].name, "List pets");
        assert_eq!(
            templates[0].url,
            "https://petstore.example/v2/pets?limit=20&status=available&tag=good+boy"
        );
        assert!(templates[0].body.is_none());
    }

    #[test]
    fn path_and_header_parameters() {
        let templates = generate(&petstore(), BASE);
        assert_eq!(templates[2].url, "https://petstore.example/v2/pets/pet-001");
        assert_eq!(templates[2].headers.get("x-request-id"), Some("{{X-Request-Id}}"));
        assert_eq!(templates[2].name, "GET /pets/{petId}");
        assert_eq!(templates[3].url, "https://petstore.example/v2/pets/{{petId}}");
    }

    #[test]
    fn json_body_uses_first_keyed_example() {
        let templates = generate(&petstore(), BASE);
        let create = &templates[1];
        assert_eq!(create.method, "POST");
        assert_eq!(create.body.as_deref(), Some(r#"{"name":"Fluffy"}"#));
        assert_eq!(create.headers.get("content-type"), Some(JSON));
    }

    #[test]
    fn no_example_means_no_body() {
        let mut op = operation("PUT", "/pets");
        op.request_body = Some(json_body(None, vec![], None));
        let template = generate_one(&op, BASE);
        assert!(template.body.is_none());
        assert!(template.headers.is_empty());
    }

    #[test]
    fn non_json_body_is_ignored() {
        let mut op = operation("PUT", "/pets");
        let mut body = json_body(Some(json!("x")), vec![], None);
        body.content_type = "application/xml".to_string();
        op.request_body = Some(body);
        assert!(generate_one(&op, BASE).body.is_none());
    }

    #[test]
    fn placeholder_query_values_stay_injectable() {
        let mut op = operation("GET", "/search?fixed=1");
        let mut q = parameter("q", ParameterLocation::Query);
        q.kind = None;
        op.parameters = vec![q];
        assert_eq!(
            generate_one(&op, BASE).url,
            "https://petstore.example/v2/search?fixed=1&q={{q}}"
        );
    }

    #[test]
    fn operation_base_url_takes_precedence() {
        let mut op = operation("GET", "/health");
        op.base_url = "http://internal:8080".to_string();
        assert_eq!(generate_one(&op, BASE).url, "http://internal:8080/health");
    }

    #[test]
    fn duplicate_keys_last_one_wins_in_first_position() {
        let mut first = operation("GET", "/pets");
        first.summary = "first".to_string();
        let other = operation("POST", "/pets");
        let mut last = operation("get", "/pets");
        last.summary = "last".to_string();

        let templates = generate(&[first, other, last], BASE);
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, "last");
        assert_eq!(
            templates[0].origin,
            RequestOrigin::Ephemeral { key: OperationKey::new("GET", "/pets") }
        );
        assert_eq!(templates[1].method, "POST");
    }

    #[test]
    fn key_set_and_lookup() {
        let operations = petstore();
        let keys = operation_keys(&operations);
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&OperationKey::new("DELETE", "/pets/{petId}")));
        assert!(contains_operation(&operations, &OperationKey::new("POST", "/pets")));
        assert!(!contains_operation(&operations, &OperationKey::new("PUT", "/pets")));
    }

    #[test]
    fn operations_without_method_or_path_are_skipped() {
        let operations = vec![operation("", "/pets"), operation("GET", " "), operation("GET", "/pets")];
        let templates = generate(&operations, BASE);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id.as_str(), "spec:GET /pets");
        assert_eq!(operation_keys(&operations).len(), 1);
    }

    #[test]
    fn templates_carry_operation_details() {
        let mut create = operation("POST", "/pets");
        create.tags = vec!["pets".to_string()];
        create.deprecated = true;
        let mut trace = parameter("X-Trace", ParameterLocation::Header);
        trace.description = "trace id".to_string();
        create.parameters = vec![trace];
        create.request_body = Some(json_body(Some(json!({})), vec![], None));

        let details = generate_one(&create, BASE).details.unwrap();
        assert_eq!(details.tags, vec!["pets"]);
        assert!(details.deprecated);
        assert_eq!(details.parameters[0].name, "X-Trace");
        assert_eq!(details.parameters[0].kind.as_deref(), Some("string"));
        assert_eq!(details.parameters[0].description, "trace id");
        assert_eq!(details.request_body.unwrap().content_type, JSON);
    }
}

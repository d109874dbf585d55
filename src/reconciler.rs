//! Keeps persisted templates in step with the ephemeral ones generated from the description.
//!
//! Persisted templates linked to an operation carry an advisory `live` flag. It only changes in
//! [`refresh_liveness`], and never blocks editing, running or deleting a template.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::http_request::{RequestOrigin, RequestTemplate, TemplateId};
use crate::operation::OperationKey;

/// Persisted templates linked to the same operation as `spec`, sorted by id.
///
/// A template sharing `spec`'s id is never its own relative.
pub fn link_related<'a>(spec: &RequestTemplate, persisted: &'a [RequestTemplate]) -> Vec<&'a RequestTemplate> {
    let Some(key) = spec.operation_key() else {
        return Vec::new();
    };
    let mut related: Vec<&RequestTemplate> = persisted
        .iter()
        .filter(|it| it.is_persisted() && it.id != spec.id && it.operation_key() == Some(key))
        .collect();
    related.sort_by(|a, b| a.id.cmp(&b.id));
    related
}

/// Returns `persisted` with every linked template's `live` flag matching `current_keys`.
pub fn refresh_liveness(
    mut persisted: Vec<RequestTemplate>,
    current_keys: &BTreeSet<OperationKey>,
) -> Vec<RequestTemplate> {
    refresh_liveness_in_place(&mut persisted, current_keys);
    persisted
}

/// Same as [`refresh_liveness`], returning how many templates flipped between live and stale.
pub fn refresh_liveness_in_place(
    persisted: &mut [RequestTemplate],
    current_keys: &BTreeSet<OperationKey>,
) -> usize {
    let mut transitions = 0;
    for template in persisted.iter_mut() {
        if let RequestOrigin::PersistedLinked { key, live } = &mut template.origin {
            let now_live = current_keys.contains(key);
            if *live != now_live {
                if now_live {
                    info!(request = %template.name, operation = %key, "operation is back, request is live again");
                } else {
                    warn!(request = %template.name, operation = %key, "operation no longer in api description");
                }
                *live = now_live;
                transitions += 1;
            }
        }
    }
    transitions
}

/// New persisted copy of `spec` in `collection_id`, keeping the operation link.
///
/// Promotion is additive: the spec template and any existing copies are left alone.
pub fn promote(spec: &RequestTemplate, collection_id: &str) -> RequestTemplate {
    let now = Utc::now();
    let origin = match spec.operation_key() {
        Some(key) => RequestOrigin::PersistedLinked { key: key.clone(), live: true },
        None => RequestOrigin::Persisted,
    };
    let promoted = RequestTemplate {
        id: TemplateId::generate(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        method: spec.method.clone(),
        url: spec.url.clone(),
        headers: spec.headers.clone(),
        body: spec.body.clone(),
        collection_id: Some(collection_id.to_string()),
        origin,
        details: spec.details.clone(),
        created_at: Some(now),
        updated_at: Some(now),
    };
    info!(request = %promoted.name, id = %promoted.id, collection = collection_id, "promoted spec request");
    promoted
}

/// Linked templates whose operation disappeared.
pub fn stale(persisted: &[RequestTemplate]) -> Vec<&RequestTemplate> {
    persisted.iter().filter(|it| !it.is_operation_live()).collect()
}

/// For each spec template, the ids of the persisted templates linked to it.
pub fn related_ids(
    specs: &[RequestTemplate],
    persisted: &[RequestTemplate],
) -> Vec<(TemplateId, Vec<TemplateId>)> {
    specs
        .iter()
        .map(|spec| {
            let ids = link_related(spec, persisted).into_iter().map(|it| it.id.clone()).collect();
            (spec.id.clone(), ids)
        })
        .collect()
}

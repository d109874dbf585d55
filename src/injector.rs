//! `{{name}}` placeholder substitution in request templates.
//!
//! A placeholder is `{{`, the shortest run of characters up to the next `}}`, then `}}`; its name is
//! the trimmed inner text. Names missing from the mapping are left in place verbatim, delimiters
//! included. Substituted values are never scanned again.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::http_request::RequestTemplate;
use crate::resolver::EffectiveMapping;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid placeholder regex"));

/// Placeholder names in `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn substitute(text: &str, mapping: &EffectiveMapping) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            match mapping.get(name) {
                Some(value) if !name.is_empty() => value.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolved copy of `template`; the input is left untouched.
pub fn inject(template: &RequestTemplate, mapping: &EffectiveMapping) -> RequestTemplate {
    let mut resolved = template.clone();
    resolved.url = substitute(&template.url, mapping);
    for header in resolved.headers.iter_mut() {
        header.value = substitute(&header.value, mapping);
    }
    resolved.body = template.body.as_deref().map(|body| substitute(body, mapping));
    resolved
}

/// Placeholder names in the url, header values and body that have no binding.
pub fn find_unresolved(template: &RequestTemplate, mapping: &EffectiveMapping) -> BTreeSet<String> {
    injectable_fields(template)
        .flat_map(placeholders)
        .filter(|name| !mapping.contains(name))
        .collect()
}

fn injectable_fields(template: &RequestTemplate) -> impl Iterator<Item = &str> {
    std::iter::once(template.url.as_str())
        .chain(template.headers.iter().map(|it| it.value.as_str()))
        .chain(template.body.as_deref())
}

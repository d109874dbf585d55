use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{info, warn};

use crate::errors::MateError;
use crate::http_request::RequestTemplate;
use crate::injector;
use crate::resolver::EffectiveMapping;

const KNOWN_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct ExecutionContext {
    pub client: reqwest::blocking::Client,
}

impl ExecutionContext {
    pub fn new() -> Result<ExecutionContext> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .cookie_store(true)
            .build()
            .context("while building the http client")?;
        Ok(ExecutionContext { client })
    }
}

#[derive(Debug)]
pub struct ExecutionResponse {
    pub status: reqwest::StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    pub duration: Duration,
}

pub fn validate(request: &RequestTemplate) -> crate::errors::Result<()> {
    if request.name.trim().is_empty() {
        return Err(MateError::validation("request name cannot be empty"));
    }
    validate_method(&request.method)?;
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(MateError::validation(format!(
            "url must start with http:// or https://: {}",
            request.url
        )));
    }
    Ok(())
}

pub fn validate_method(method: &str) -> crate::errors::Result<()> {
    if !KNOWN_METHODS.contains(&method.trim().to_ascii_uppercase().as_str()) {
        return Err(MateError::validation(format!("invalid http method: {}", method)));
    }
    Ok(())
}

impl RequestTemplate {
    pub fn http_method(&self) -> Result<reqwest::Method> {
        reqwest::Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| anyhow!("{} is a unknown http method", self.method))
    }

    pub fn http_url(&self) -> Result<reqwest::Url> {
        self.url
            .parse::<reqwest::Url>()
            .map_err(|e| anyhow!("{:?} @ '{}'", e, self.url))
    }

    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for header in self.headers.iter() {
            let name = HeaderName::try_from(header.name.as_str())
                .with_context(|| format!("invalid header name '{}'", header.name))?;
            let value = HeaderValue::try_from(header.value.as_str())
                .with_context(|| format!("invalid value for header '{}'", header.name))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// Resolves `request` against `mapping` and sends it.
///
/// Unresolved placeholders are only warned about; the request goes out with them in place.
pub fn execute_http_request(
    request: &RequestTemplate,
    mapping: &EffectiveMapping,
    context: &ExecutionContext,
) -> Result<ExecutionResponse> {
    let unresolved = injector::find_unresolved(request, mapping);
    if !unresolved.is_empty() {
        let names: Vec<&str> = unresolved.iter().map(String::as_str).collect();
        warn!(request = %request.name, unresolved = %names.join(", "), "request has unresolved variables");
    }

    let resolved = injector::inject(request, mapping);
    validate(&resolved).with_context(|| format!("cannot execute '{}'", resolved.name))?;

    let mut builder = context
        .client
        .request(resolved.http_method()?, resolved.http_url()?)
        .headers(resolved.header_map()?);
    if let Some(body) = resolved.body.clone() {
        builder = builder.body(body);
    }

    let start = Instant::now();
    let response = builder
        .send()
        .with_context(|| format!("request '{}' failed", resolved.name))?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().context("while reading the response body")?;
    let duration = start.elapsed();

    info!(request = %resolved.name, status = status.as_u16(), elapsed_ms = duration.as_millis() as u64, "request executed");
    Ok(ExecutionResponse { status, headers, body, duration })
}

pub fn format_response(response: &ExecutionResponse) -> String {
    let headers: String = response
        .headers
        .iter()
        .map(|(name, value)| format!("  {}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<String>>()
        .join("\n");
    format!(
        "Status: {}\nDuration: {:?}\n\nHeaders:\n{}\n\nBody:\n{}",
        response.status, response.duration, headers, response.body
    )
}

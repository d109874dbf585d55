use crate::http_request::RequestTemplate;

/// Single line curl command for an already resolved template.
pub fn to_curl(request: &RequestTemplate) -> String {
    let mut parts = vec!["curl".to_string()];
    if !request.method.is_empty() && request.method != "GET" {
        parts.push(format!("-X {}", request.method));
    }
    for header in request.headers.iter() {
        parts.push(format!("-H {}", quote(&format!("{}: {}", header.name, header.value))));
    }
    if let Some(body) = request.body.as_deref().filter(|it| !it.is_empty()) {
        parts.push(format!("-d {}", quote(body)));
    }
    parts.push(quote(&request.url));
    parts.join(" ")
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

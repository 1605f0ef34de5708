use crate::domain::{BodyType, BuiltRequest, HttpMethod, RequestSpec};
use crate::error::Error;
use std::collections::HashMap;
use url::form_urlencoded;

/// Turn a request description into its wire-ready form. Pure and
/// deterministic: the load-test harness builds once and reuses the result
/// across every concurrent attempt.
///
/// # Errors
///
/// Returns [`Error::InvalidJsonBody`] when a JSON body is requested but does
/// not parse.
pub fn build(spec: &RequestSpec) -> Result<BuiltRequest, Error> {
    let mut headers = HashMap::new();
    for row in &spec.headers {
        if row.enabled && !row.key.is_empty() {
            // last write wins on duplicate keys
            headers.insert(row.key.clone(), row.value.clone());
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for row in &spec.query_params {
        if row.enabled && !row.key.is_empty() {
            serializer.append_pair(&row.key, &row.value);
        }
    }
    let query = serializer.finish();
    let url = if query.is_empty() {
        spec.url.clone()
    } else {
        format!("{}?{}", spec.url, query)
    };

    let body = if spec.method != HttpMethod::Get
        && spec.body_type == BodyType::Json
        && !spec.body.is_empty()
    {
        serde_json::from_str::<serde_json::Value>(&spec.body)
            .map_err(|err| Error::InvalidJsonBody(err.to_string()))?;
        Some(spec.body.clone())
    } else {
        None
    };

    Ok(BuiltRequest {
        method: spec.method,
        url,
        headers,
        body,
    })
}

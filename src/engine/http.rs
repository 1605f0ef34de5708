use crate::domain::{ExecutionOutcome, RequestSpec};
use crate::engine::{builder, script};
use crate::error::Error;
use crate::history::HistoryLedger;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Instant;

/// Convert the built header map into reqwest form.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] for names or values the HTTP layer
/// rejects (possible after script mutation).
pub fn build_headers(input: &HashMap<String, String>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
            Error::InvalidHeader {
                key: key.clone(),
                message: err.to_string(),
            }
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| Error::InvalidHeader {
            key: key.clone(),
            message: err.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn error_outcome(message: impl Into<String>, elapsed_millis: u64) -> ExecutionOutcome {
    ExecutionOutcome {
        status: 0,
        status_text: "Error".into(),
        elapsed_millis,
        size_bytes: 0,
        headers: HashMap::new(),
        parsed_body: None,
        raw_body: message.into(),
        script_logs: Vec::new(),
    }
}

/// Execute one configured request: pre-script, build, transmit, post-script.
///
/// Always returns an outcome; build and transport failures are encoded as the
/// status-0 sentinel rather than surfaced as errors. Elapsed time spans from
/// just before the pre-script to just after the transport call returns, so
/// script time is part of the reported latency.
pub async fn execute(spec: &RequestSpec, history: &HistoryLedger) -> ExecutionOutcome {
    let started = Instant::now();
    let mut logs = Vec::new();
    let mut working = spec.clone();
    script::run(&spec.pre_script, &mut working, None, &mut logs);

    let mut outcome = match transmit(&working, started).await {
        Ok(outcome) => outcome,
        Err(message) => {
            logs.push(format!("Network Error: {message}"));
            error_outcome(message, started.elapsed().as_millis() as u64)
        }
    };

    // The post-script only runs when a response was obtained; its logs land
    // in the same ordered list as the pre-script's.
    if outcome.status != 0 {
        script::run(&spec.post_script, &mut working, Some(&outcome), &mut logs);
    }
    outcome.script_logs = logs;

    let response_status = (outcome.status != 0).then_some(outcome.status);
    history.record(spec, response_status);
    tracing::debug!(
        method = %spec.method,
        url = %spec.url,
        status = outcome.status,
        elapsed_ms = outcome.elapsed_millis,
        "request finished"
    );
    outcome
}

async fn transmit(working: &RequestSpec, started: Instant) -> Result<ExecutionOutcome, String> {
    let built = builder::build(working).map_err(|err| err.to_string())?;
    let headers = build_headers(&built.headers).map_err(|err| err.to_string())?;

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|err| format!("Failed to build HTTP client: {err}"))?;

    let mut request = client
        .request(built.method.into(), &built.url)
        .headers(headers);
    if let Some(body) = &built.body {
        request = request.body(body.clone());
    }

    let response = request
        .send()
        .await
        .map_err(|err| format!("Request failed: {err}"))?;
    let elapsed_millis = started.elapsed().as_millis() as u64;

    let status = response.status();
    let status_text = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| {
            if status.as_u16() == 200 {
                "OK".to_string()
            } else {
                String::new()
            }
        });

    let mut response_headers = HashMap::new();
    for (key, value) in response.headers() {
        response_headers.insert(
            key.to_string(),
            value.to_str().unwrap_or_default().to_string(),
        );
    }

    let declared_size = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let bytes = response
        .bytes()
        .await
        .map_err(|err| format!("Failed to read response: {err}"))?;
    let raw_body = String::from_utf8_lossy(&bytes).to_string();
    // Non-JSON bodies are simply not parsed; that is not a failure.
    let parsed_body = serde_json::from_str::<serde_json::Value>(&raw_body).ok();
    let size_bytes = declared_size.unwrap_or(bytes.len() as u64);

    Ok(ExecutionOutcome {
        status: status.as_u16(),
        status_text,
        elapsed_millis,
        size_bytes,
        headers: response_headers,
        parsed_body,
        raw_body,
        script_logs: Vec::new(),
    })
}

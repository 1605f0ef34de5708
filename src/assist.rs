//! Prompt construction for the external text-generation collaborator and the
//! fallback handling around it. The collaborator itself is opaque: anything
//! that can turn a prompt into text plugs in through [`TextGenerator`].

use crate::domain::{ExecutionOutcome, RequestSpec};
use crate::error::Error;

/// Returned when Go code generation fails for any reason.
pub const GO_CODE_FALLBACK: &str =
    "// Failed to generate Go code. Check your API key and try again.";

/// Returned when response analysis fails for any reason.
pub const ANALYSIS_FALLBACK: &str = "Unable to analyze the response right now.";

/// Snippet budget for the response body inside the analysis prompt.
const BODY_SNIPPET_CHARS: usize = 1000;

#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, Error>;
}

/// Deterministic prompt asking for a Go `net/http` + `testing` test file for
/// the request. Encodes method, full URL with enabled params, enabled headers
/// and body.
pub fn go_test_prompt(spec: &RequestSpec) -> String {
    let headers = spec
        .headers
        .iter()
        .filter(|row| row.enabled && !row.key.is_empty())
        .map(|row| format!("\"{}\": \"{}\"", row.key, row.value))
        .collect::<Vec<_>>()
        .join(", ");

    let params = spec
        .query_params
        .iter()
        .filter(|row| row.enabled && !row.key.is_empty())
        .map(|row| format!("{}={}", row.key, row.value))
        .collect::<Vec<_>>()
        .join("&");

    let full_url = if params.is_empty() {
        spec.url.clone()
    } else {
        format!("{}?{}", spec.url, params)
    };
    let body = if spec.body.is_empty() {
        "nil"
    } else {
        spec.body.as_str()
    };

    format!(
        "You are a senior Go (Golang) developer.\n\
         Generate a complete, runnable Go source file that tests the following API request \
         using the \"net/http\" and \"testing\" packages.\n\
         \n\
         Request details:\n\
         - Method: {method}\n\
         - URL: {full_url}\n\
         - Headers: {{{headers}}}\n\
         - Body: {body}\n\
         \n\
         Requirements:\n\
         1. Create a test function named 'TestAPI_{method}'.\n\
         2. Use 'http.NewRequest'.\n\
         3. Set all request headers.\n\
         4. Handle JSON marshaling if a body is present.\n\
         5. Assert the status code is 200 (or an appropriate success code).\n\
         6. Output raw Go code only, without markdown fences or extra explanation.",
        method = spec.method,
    )
}

/// Deterministic prompt asking for a short explanation of a response.
pub fn analysis_prompt(spec: &RequestSpec, outcome: &ExecutionOutcome) -> String {
    let snippet: String = outcome.raw_body.chars().take(BODY_SNIPPET_CHARS).collect();

    format!(
        "Analyze this API response and explain it briefly.\n\
         \n\
         Request: {method} {url}\n\
         Response status: {status}\n\
         Response body (snippet): {snippet}...\n\
         \n\
         If it is an error (4xx/5xx), explain the likely causes and how to fix it in Go.\n\
         If it is a success, describe the structure of the returned data.\n\
         Use Markdown formatting.",
        method = spec.method,
        url = spec.url,
        status = outcome.status,
    )
}

/// Ask the collaborator for a Go test file; any failure yields the fixed
/// fallback comment instead of an error.
pub async fn generate_go_test<G: TextGenerator>(generator: &G, spec: &RequestSpec) -> String {
    match generator.generate(&go_test_prompt(spec)).await {
        Ok(reply) => strip_code_fences(&reply),
        Err(err) => {
            tracing::warn!(error = %err, "go code generation failed");
            GO_CODE_FALLBACK.to_string()
        }
    }
}

/// Ask the collaborator to explain an outcome; any failure yields the fixed
/// fallback text instead of an error.
pub async fn analyze_response<G: TextGenerator>(
    generator: &G,
    spec: &RequestSpec,
    outcome: &ExecutionOutcome,
) -> String {
    match generator.generate(&analysis_prompt(spec, outcome)).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(error = %err, "response analysis failed");
            ANALYSIS_FALLBACK.to_string()
        }
    }
}

fn strip_code_fences(reply: &str) -> String {
    reply.replace("```go", "").replace("```", "").trim().to_string()
}

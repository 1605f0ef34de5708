use crate::domain::{ExecutionOutcome, RequestSpec};
use rquickjs::{CatchResultExt, CaughtError, Context, Runtime};

/// Installed before the user script runs. The evaluation context exposes
/// exactly three bindings: `request` (mutable view of the working spec),
/// `response` (present only after transport, read-only by convention) and
/// `console.log`, which stringifies each argument and appends one joined
/// line per call.
const PRELUDE: &str = r#"
globalThis.__logs = [];
globalThis.console = {
    log: function () {
        var parts = [];
        for (var i = 0; i < arguments.length; i++) {
            parts.push(JSON.stringify(arguments[i]));
        }
        __logs.push(parts.join(' '));
    }
};
globalThis.request = JSON.parse(__request_json);
globalThis.response =
    typeof __response_json === 'string' ? JSON.parse(__response_json) : undefined;
"#;

/// Run a user script against the request/response context.
///
/// Failures never propagate: a throwing script is downgraded to a
/// `Script Error: …` log line inside the JS wrapper, and a failure of the
/// sandbox itself (engine setup, syntax error, shape-corrupting mutation)
/// becomes a `System Error: …` log line. Request mutations made by the script
/// are written back into `request`; everything else the script did is
/// discarded with the evaluation context.
pub fn run(
    source: &str,
    request: &mut RequestSpec,
    response: Option<&ExecutionOutcome>,
    logs: &mut Vec<String>,
) {
    if source.trim().is_empty() {
        return;
    }
    if let Err(message) = eval_in_sandbox(source, request, response, logs) {
        logs.push(format!("System Error: {message}"));
    }
}

fn eval_in_sandbox(
    source: &str,
    request: &mut RequestSpec,
    response: Option<&ExecutionOutcome>,
    logs: &mut Vec<String>,
) -> Result<(), String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let context = Context::full(&runtime).map_err(|err| err.to_string())?;

    let request_json = serde_json::to_string(request).map_err(|err| err.to_string())?;
    let response_json = match response {
        Some(outcome) => Some(serde_json::to_string(outcome).map_err(|err| err.to_string())?),
        None => None,
    };

    context.with(|ctx| {
        let globals = ctx.globals();
        globals
            .set("__request_json", request_json)
            .map_err(|err| err.to_string())?;
        if let Some(json) = response_json {
            globals
                .set("__response_json", json)
                .map_err(|err| err.to_string())?;
        }

        ctx.eval::<(), _>(PRELUDE)
            .catch(&ctx)
            .map_err(|err| format_js_error(&err))?;

        // The wrapper catches anything the script throws so a failing script
        // never aborts the surrounding request flow.
        let wrapped = format!(
            "try {{\n{source}\n}} catch (e) {{ \
             console.log(\"Script Error: \" + (e && e.message ? e.message : String(e))); }}"
        );
        ctx.eval::<(), _>(wrapped)
            .catch(&ctx)
            .map_err(|err| format_js_error(&err))?;

        // Logs are harvested before the request view so they survive a failed
        // read-back.
        let lines: Vec<String> = globals.get("__logs").map_err(|err| err.to_string())?;
        logs.extend(lines);

        let updated: String = ctx
            .eval("JSON.stringify(globalThis.request)")
            .catch(&ctx)
            .map_err(|err| format_js_error(&err))?;
        let next: RequestSpec = serde_json::from_str(&updated)
            .map_err(|err| format!("script produced an invalid request shape: {err}"))?;
        *request = next;
        Ok(())
    })
}

fn format_js_error(error: &CaughtError<'_>) -> String {
    match error {
        CaughtError::Exception(exception) => {
            let message = exception
                .message()
                .unwrap_or_else(|| "Unknown error".to_string());
            match exception.stack() {
                Some(stack) => format!("{message}\n{stack}"),
                None => message,
            }
        }
        CaughtError::Value(value) => format!("Exception: {value:?}"),
        CaughtError::Error(err) => err.to_string(),
    }
}

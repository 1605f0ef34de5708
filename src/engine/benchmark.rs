use crate::domain::{BenchmarkReport, BenchmarkSample, RequestSpec};
use crate::engine::builder;
use crate::engine::http::build_headers;
use crate::error::Error;
use hdrhistogram::Histogram;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// Latencies above an hour saturate the histogram rather than failing it.
const HISTOGRAM_MAX_MS: u64 = 3_600_000;

/// Everything a worker needs per attempt, built exactly once and shared.
#[derive(Debug, Clone)]
struct RequestTemplate {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<String>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}

/// Fire `concurrency` virtual users, each issuing `loops_per_user` sequential
/// attempts against the same pre-built request, and aggregate the samples.
///
/// Pre/post scripts are deliberately not executed per attempt: their overhead
/// would distort the throughput measurement. Every attempt contributes one
/// sample; transport failures record the status-0 sentinel but keep their
/// latency. The harness waits for every worker's every attempt before the
/// report is built.
///
/// # Errors
///
/// Rejects `concurrency`/`loops_per_user` of 0 and invalid request specs
/// before any worker starts; fails hard only if a worker panics.
pub async fn run_load(
    spec: &RequestSpec,
    concurrency: u32,
    loops_per_user: u32,
) -> Result<BenchmarkReport, Error> {
    if concurrency < 1 {
        return Err(Error::InvalidConcurrency);
    }
    if loops_per_user < 1 {
        return Err(Error::InvalidLoops);
    }

    let built = builder::build(spec)?;
    let headers = build_headers(&built.headers)?;
    let template = Arc::new(RequestTemplate {
        method: built.method.into(),
        url: built.url,
        headers,
        body: built.body,
    });
    let client = Arc::new(
        Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| Error::ClientBuild(err.to_string()))?,
    );

    tracing::info!(concurrency, loops_per_user, url = %template.url, "load test started");
    let started = Instant::now();
    let (sample_tx, mut sample_rx) = mpsc::unbounded_channel();

    let mut handles = Vec::with_capacity(concurrency as usize);
    for user in 0..u64::from(concurrency) {
        let client = client.clone();
        let template = template.clone();
        let sample_tx = sample_tx.clone();
        let loops = u64::from(loops_per_user);

        handles.push(tokio::spawn(async move {
            // Attempts within one worker are strictly sequential.
            for attempt in 0..loops {
                let issued_at = now_ms();
                let attempt_started = Instant::now();
                let status = match attempt_once(&client, &template).await {
                    Ok(status) => status,
                    Err(_) => 0,
                };
                let sample = BenchmarkSample {
                    sequence_id: user * loops + attempt,
                    issued_at_epoch_millis: issued_at,
                    status,
                    latency_millis: attempt_started.elapsed().as_millis() as u64,
                };
                let _ = sample_tx.send(sample);
            }
        }));
    }
    drop(sample_tx);

    for handle in handles {
        handle
            .await
            .map_err(|err| Error::WorkerPanic(err.to_string()))?;
    }

    let expected = u64::from(concurrency) * u64::from(loops_per_user);
    let mut samples = Vec::with_capacity(expected as usize);
    while let Some(sample) = sample_rx.recv().await {
        samples.push(sample);
    }

    let report = summarize(samples, started.elapsed().as_millis() as u64)?;
    tracing::info!(
        total = report.total_requests,
        errors = report.error_count,
        rps = report.requests_per_second,
        "load test finished"
    );
    Ok(report)
}

async fn attempt_once(client: &Client, template: &RequestTemplate) -> Result<u16, reqwest::Error> {
    let mut request = client
        .request(template.method.clone(), &template.url)
        .headers(template.headers.clone());
    if let Some(body) = &template.body {
        request = request.body(body.clone());
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    // Consume and discard the body so the connection can be reused; a read
    // failure counts as a failed attempt.
    response.bytes().await?;
    Ok(status)
}

fn summarize(
    mut samples: Vec<BenchmarkSample>,
    total_elapsed_millis: u64,
) -> Result<BenchmarkReport, Error> {
    samples.sort_by_key(|sample| sample.sequence_id);

    let mut histogram = Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_MS, 3)
        .map_err(|err| Error::Histogram(err.to_string()))?;

    let total_requests = samples.len() as u64;
    let mut success_count = 0u64;
    let mut latency_sum = 0u64;
    let mut min_latency = u64::MAX;
    let mut max_latency = 0u64;

    for sample in &samples {
        if (200..400).contains(&sample.status) {
            success_count += 1;
        }
        latency_sum += sample.latency_millis;
        min_latency = min_latency.min(sample.latency_millis);
        max_latency = max_latency.max(sample.latency_millis);
        let _ = histogram.record(sample.latency_millis.clamp(1, HISTOGRAM_MAX_MS));
    }

    let avg_latency = if total_requests == 0 {
        0.0
    } else {
        latency_sum as f64 / total_requests as f64
    };
    let elapsed_secs = (total_elapsed_millis as f64 / 1000.0).max(0.001);

    Ok(BenchmarkReport {
        total_requests,
        success_count,
        error_count: total_requests - success_count,
        total_elapsed_millis,
        avg_latency,
        min_latency: if total_requests == 0 { 0 } else { min_latency },
        max_latency,
        p50_latency: histogram.value_at_quantile(0.50),
        p90_latency: histogram.value_at_quantile(0.90),
        p95_latency: histogram.value_at_quantile(0.95),
        p99_latency: histogram.value_at_quantile(0.99),
        requests_per_second: total_requests as f64 / elapsed_secs,
        timeline: samples,
    })
}

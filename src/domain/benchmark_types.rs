use serde::{Deserialize, Serialize};

/// One completed load-test attempt, success or failure. `status == 0` means
/// the attempt got no HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSample {
    pub sequence_id: u64,
    pub issued_at_epoch_millis: u64,
    pub status: u16,
    pub latency_millis: u64,
}

/// Aggregate of a finished load test. Built once after every worker's every
/// attempt has completed; the timeline is ordered by `sequence_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_elapsed_millis: u64,
    pub avg_latency: f64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub p50_latency: u64,
    pub p90_latency: u64,
    pub p95_latency: u64,
    pub p99_latency: u64,
    pub requests_per_second: f64,
    pub timeline: Vec<BenchmarkSample>,
}

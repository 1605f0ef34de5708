use thiserror::Error;

/// Failures the engine reports to its caller. Transport and script failures
/// are never surfaced here; they are encoded into the returned outcome or
/// sample data instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid JSON body: {0}")]
    InvalidJsonBody(String),
    #[error("Invalid header `{key}`: {message}")]
    InvalidHeader { key: String, message: String },
    #[error("Load concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("Load loops per user must be at least 1")]
    InvalidLoops,
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("Failed to initialize latency histogram: {0}")]
    Histogram(String),
    #[error("Load worker crashed: {0}")]
    WorkerPanic(String),
    #[error("Text generation failed: {0}")]
    TextGeneration(String),
}

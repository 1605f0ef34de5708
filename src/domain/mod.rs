mod benchmark_types;
mod types;

pub use benchmark_types::{BenchmarkReport, BenchmarkSample};
pub use types::{
    BodyType, BuiltRequest, ExecutionOutcome, HistoryEntry, HttpMethod, KeyValue, RequestSpec,
};

pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors surfaced by the benchmark driver and the timing analysis.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("unsupported platform for benchmarks: {0}")]
    UnsupportedPlatform(String),
    #[error("could not start the verifier server '{0}'")]
    ServerStart(String),
    #[error("could not locate the directory of the running executable")]
    ExecutableDir,
    #[error("no timing samples for '{0}'")]
    EmptySamples(String),
    #[error("mean verification time of '{0}' is zero, percentage difference is undefined")]
    ZeroMean(String),
    #[error("no file is present in both timing records")]
    NoPairedFiles,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("--generate and --username flags are mutually exclusive")]
    GenerateWithUsername,

    #[error("--delimiter can only be used when --username is also used")]
    DelimiterWithoutUsername,

    #[error("hash type selection is not supported in convert mode")]
    SchemeInConvertMode,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stdin reader encountered an error: {0}")]
    Input(#[source] std::io::Error),

    #[error(transparent)]
    Codec(#[from] aspnet_hash::Error),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("worker pool closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),
}

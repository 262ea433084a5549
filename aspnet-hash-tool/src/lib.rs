//! Streams stdin through the [`aspnet_hash`] codec.
//!
//! Every input line becomes one unit of work. Lines are admitted in input
//! order through an optional rate limiter and an optional cap on concurrent
//! workers, hashed or converted on tokio's blocking pool, and written to the
//! output as they finish. Lines that fail are counted and dropped; nothing
//! partial is ever written.

pub mod cli;
pub mod error;
pub mod limiter;
pub mod operation;
pub mod output;
pub mod pipeline;
pub mod stats;

pub use cli::{Args, DEFAULT_DELIMITER, RunConfig};
pub use error::Error;
pub use limiter::RateLimiter;
pub use operation::{LineOperation, Operation};
pub use output::LineSink;
pub use pipeline::{Pipeline, PipelineConfig};
pub use stats::{RunStatistics, RunSummary};

mod http;

pub use http::HttpTransport;

use crate::model::{RunConfig, RunReply};
use std::fmt;
use std::future::Future;

/// Failures below the application layer: the endpoint never produced a usable answer.
#[derive(Debug)]
pub enum TransportError {
    Network(String),
    Timeout,
    Malformed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
            TransportError::Timeout => f.write_str("request timed out"),
            TransportError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The single request/response exchange with the execution service. At most once per
/// call; implementations never retry.
pub trait RunTransport: Send + Sync {
    fn run_tuning_job(
        &self,
        config: &RunConfig,
    ) -> impl Future<Output = Result<RunReply, TransportError>> + Send;
}

use crate::config::HostAndPort;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

pub type PinFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// One remote command scheduled through a [`RemoteExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommandRequest {
    pub target: HostAndPort,
    pub command: Value,
    pub timeout: Duration,
}

impl RemoteCommandRequest {
    pub fn new(target: HostAndPort, command: Value, timeout: Duration) -> Self {
        Self {
            target,
            command,
            timeout,
        }
    }
}

pub type RemoteCommandResult = Result<Value, RemoteCommandError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteCommandError {
    #[error("request to {target} timed out after {timeout_ms}ms")]
    TimedOut { target: HostAndPort, timeout_ms: u64 },

    #[error("connection to {target} failed: {reason}")]
    Unreachable { target: HostAndPort, reason: String },

    #[error("executor shut down before the request to {target} completed")]
    ShutDown { target: HostAndPort },
}

/// Asynchronous remote-command scheduler.
///
/// `submit` resolves exactly once per request: with the remote's reply
/// document, with a transport failure, or with
/// [`RemoteCommandError::ShutDown`] when the executor stops before the
/// request completes. Deadline enforcement belongs to the executor; a request
/// that outlives its `timeout` resolves [`RemoteCommandError::TimedOut`].
pub trait RemoteExecutor {
    fn submit(&self, request: RemoteCommandRequest) -> PinFuture<RemoteCommandResult>;
}

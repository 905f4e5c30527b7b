#![allow(dead_code)]

use replset_quorum::{
    HostAndPort, PinFuture, RemoteCommandError, RemoteCommandRequest, RemoteCommandResult,
    RemoteExecutor,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// How the executor disposes of a request addressed to a given endpoint.
pub enum Script {
    Reply(Value),
    Timeout,
    Unreachable(&'static str),
    ShutDown,
    /// Never resolves; models a request still in flight when the run ends.
    Hold,
}

/// Executor whose behavior is scripted per target endpoint. Every submission
/// is recorded so tests can assert on the outbound traffic.
pub struct ScriptedExecutor {
    scripts: HashMap<HostAndPort, Script>,
    submitted: Mutex<Vec<RemoteCommandRequest>>,
}

impl ScriptedExecutor {
    pub fn new(scripts: Vec<(HostAndPort, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Executor with no scripts at all; any submission panics the test.
    pub fn refusing_all() -> Self {
        Self::new(Vec::new())
    }

    pub fn submitted_requests(&self) -> Vec<RemoteCommandRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_targets(&self) -> Vec<HostAndPort> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.target.clone())
            .collect()
    }
}

impl RemoteExecutor for ScriptedExecutor {
    fn submit(&self, request: RemoteCommandRequest) -> PinFuture<RemoteCommandResult> {
        self.submitted.lock().unwrap().push(request.clone());
        let target = request.target.clone();
        match self.scripts.get(&target) {
            Some(Script::Reply(reply)) => {
                let reply = reply.clone();
                Box::pin(async move { Ok(reply) })
            }
            Some(Script::Timeout) => {
                let timeout_ms = request.timeout.as_millis() as u64;
                Box::pin(async move { Err(RemoteCommandError::TimedOut { target, timeout_ms }) })
            }
            Some(Script::Unreachable(reason)) => {
                let reason = reason.to_string();
                Box::pin(async move { Err(RemoteCommandError::Unreachable { target, reason }) })
            }
            Some(Script::ShutDown) => {
                Box::pin(async move { Err(RemoteCommandError::ShutDown { target }) })
            }
            Some(Script::Hold) => Box::pin(std::future::pending()),
            None => panic!("no script for request to {target}"),
        }
    }
}

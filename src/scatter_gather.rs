use crate::executor::{RemoteCommandError, RemoteCommandRequest, RemoteCommandResult, RemoteExecutor};
use log::warn;
use thiserror::Error;
use tokio::sync::mpsc;

/// Decision object driven by a [`ScatterGatherRunner`].
///
/// The runner calls `requests` exactly once at start, feeds every completion
/// through `process_response` one at a time, and stops the first time
/// `has_sufficient_responses` returns true. It never calls `process_response`
/// after that point. `has_sufficient_responses` must be monotone: once true,
/// it stays true for the life of the algorithm instance.
pub trait ScatterGatherAlgorithm {
    /// Full set of outbound requests. Empty if the algorithm is already
    /// complete at start.
    fn requests(&self) -> Vec<RemoteCommandRequest>;

    /// Ingests one completion, paired with the request that produced it.
    fn process_response(&mut self, request: &RemoteCommandRequest, result: &RemoteCommandResult);

    fn has_sufficient_responses(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScatterGatherError {
    #[error("scatter-gather run canceled: executor shut down before a verdict")]
    Canceled,
}

/// Drives a [`ScatterGatherAlgorithm`] against a [`RemoteExecutor`] until the
/// algorithm declares sufficiency.
///
/// Completions are consumed by a single loop, so calls into the algorithm are
/// mutually exclusive. Requests still outstanding when sufficiency is reached
/// are not cancelled; their completions go to a closed channel and are
/// dropped.
pub struct ScatterGatherRunner<'a, A: ScatterGatherAlgorithm> {
    algorithm: &'a mut A,
}

impl<'a, A: ScatterGatherAlgorithm> ScatterGatherRunner<'a, A> {
    pub fn new(algorithm: &'a mut A) -> Self {
        Self { algorithm }
    }

    pub async fn run<E>(&mut self, executor: &E) -> Result<(), ScatterGatherError>
    where
        E: RemoteExecutor + ?Sized,
    {
        if self.algorithm.has_sufficient_responses() {
            return Ok(());
        }

        let (completions, mut inbox) = mpsc::unbounded_channel();
        let requests = self.algorithm.requests();
        let scheduled = requests.len();
        for request in requests {
            let response = executor.submit(request.clone());
            let completions = completions.clone();
            tokio::spawn(async move {
                let _ = completions.send((request, response.await));
            });
        }
        drop(completions);

        while !self.algorithm.has_sufficient_responses() {
            let Some((request, result)) = inbox.recv().await else {
                // Every scheduled request has reported and the algorithm still
                // wants more. Nothing further can arrive; surface the
                // algorithm's own terminal state to the caller.
                warn!("event=scatter_gather_exhausted scheduled={scheduled}");
                return Ok(());
            };
            if matches!(result, Err(RemoteCommandError::ShutDown { .. })) {
                return Err(ScatterGatherError::Canceled);
            }
            self.algorithm.process_response(&request, &result);
        }
        Ok(())
    }
}

//! The chunk-send loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::policy::RetryPolicy;
use crate::request::{ChunkError, ChunkStatus, ErrorClass, Progress, TransferRequest};
use crate::session::UploadSession;

/// Final result of driving one upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The remote item identifier.
    Success(String),
    Aborted(AbortReason),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            UploadOutcome::Success(id) => Some(id),
            UploadOutcome::Aborted(_) => None,
        }
    }
}

/// Why an upload session ended without an item identifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbortReason {
    #[error("retries exhausted after {attempts} attempts, last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("fatal HTTP error {status}: {message}")]
    Fatal { status: u16, message: String },

    /// The final response carried no item identifier.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("cancelled")]
    Cancelled,
}

/// Progress notifications emitted while an upload runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// A chunk send is about to be issued.
    Sending { attempt: u32 },
    /// A chunk was accepted and more remain.
    ChunkAccepted(Progress),
    /// A transient error occurred; the driver sleeps `delay` before retrying.
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        error: String,
    },
    Completed { item_id: String },
    Aborted { reason: AbortReason },
}

/// Drives a [`TransferRequest`] to completion with retry and backoff.
#[derive(Debug, Clone, Default)]
pub struct ResumableUploadDriver {
    policy: RetryPolicy,
    events_tx: Option<mpsc::Sender<UploadEvent>>,
    cancel: Option<CancellationToken>,
}

impl ResumableUploadDriver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            events_tx: None,
            cancel: None,
        }
    }

    /// Emits [`UploadEvent`]s on `events_tx`.
    pub fn with_events(mut self, events_tx: mpsc::Sender<UploadEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Observes `cancel` before each chunk send and during backoff sleeps.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Uploads through `request` until the remote side reports completion.
    ///
    /// `on_complete` is called exactly once, with the remote item
    /// identifier, and only when the outcome is [`UploadOutcome::Success`].
    pub async fn run<R, F>(&self, request: R, on_complete: F) -> UploadOutcome
    where
        R: TransferRequest,
        F: FnOnce(&str),
    {
        let mut session = UploadSession::new(request);
        self.run_session(&mut session, on_complete).await
    }

    /// Like [`run`](Self::run), but leaves the finished session with the
    /// caller for inspection.
    ///
    /// A session that is already terminal is reported as-is without any
    /// chunk send and without calling `on_complete`.
    pub async fn run_session<R, F>(
        &self,
        session: &mut UploadSession<R>,
        on_complete: F,
    ) -> UploadOutcome
    where
        R: TransferRequest,
        F: FnOnce(&str),
    {
        loop {
            if session.state().is_terminal() {
                return terminal_outcome(session);
            }
            if self.is_cancelled() {
                return self.abort(session, AbortReason::Cancelled).await;
            }

            let attempt = session.attempt();
            let Some(request) = session.request_mut() else {
                return terminal_outcome(session);
            };

            info!(attempt, "uploading file");
            self.emit(UploadEvent::Sending { attempt }).await;

            match request.send_next_chunk().await {
                Ok(ChunkStatus::InProgress(progress)) => {
                    session.chunk_accepted(&self.policy);
                    debug!(
                        bytes_sent = progress.bytes_sent,
                        total_bytes = progress.total_bytes,
                        percent = (progress.fraction() * 100.0).round() as u64,
                        "chunk accepted"
                    );
                    self.emit(UploadEvent::ChunkAccepted(progress)).await;
                }
                Ok(ChunkStatus::Complete(response)) => {
                    let Some(item_id) = item_id(&response) else {
                        let reason = AbortReason::UnexpectedResponse(response.to_string());
                        return self.abort(session, reason).await;
                    };

                    session.complete(item_id.clone());
                    info!(item_id = %item_id, "upload completed");
                    on_complete(&item_id);
                    self.emit(UploadEvent::Completed {
                        item_id: item_id.clone(),
                    })
                    .await;
                    return UploadOutcome::Success(item_id);
                }
                Err(err) => {
                    if let Some(reason) = self.retry_after(session, err).await {
                        return self.abort(session, reason).await;
                    }
                }
            }
        }
    }

    /// Handles a failed chunk send. Returns the abort reason when the
    /// session cannot continue; otherwise sleeps and leaves it `Uploading`.
    async fn retry_after<R: TransferRequest>(
        &self,
        session: &mut UploadSession<R>,
        err: ChunkError,
    ) -> Option<AbortReason> {
        let class = err.class();
        if class == ErrorClass::FatalProtocol {
            return Some(AbortReason::Fatal {
                status: err.status().unwrap_or_default(),
                message: err.to_string(),
            });
        }

        match class {
            ErrorClass::TransientProtocol => warn!(error = %err, "retriable HTTP error"),
            _ => warn!(error = %err, "retriable transport error"),
        }

        let Some(attempt) = session.transient_failure(&self.policy) else {
            return Some(AbortReason::RetriesExhausted {
                attempts: session.attempt(),
                last_error: err.to_string(),
            });
        };

        let delay = self.policy.delay_for_attempt(attempt);
        let delay_secs = delay.as_secs_f64();
        info!(
            attempt,
            delay_secs = format_args!("{delay_secs:.3}"),
            "sleeping before retry"
        );
        self.emit(UploadEvent::RetryScheduled {
            attempt,
            delay,
            error: err.to_string(),
        })
        .await;

        if !self.backoff(delay).await {
            return Some(AbortReason::Cancelled);
        }
        session.resume();
        None
    }

    /// Sleeps for `delay`. Returns `false` if cancelled first.
    async fn backoff(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(cancel) => tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            },
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    async fn abort<R: TransferRequest>(
        &self,
        session: &mut UploadSession<R>,
        reason: AbortReason,
    ) -> UploadOutcome {
        error!(reason = %reason, "upload aborted");
        session.fail(reason.clone());
        self.emit(UploadEvent::Aborted {
            reason: reason.clone(),
        })
        .await;
        UploadOutcome::Aborted(reason)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Extracts the non-empty `id` field of a final response.
fn item_id(response: &serde_json::Value) -> Option<String> {
    response
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn terminal_outcome<R: TransferRequest>(session: &UploadSession<R>) -> UploadOutcome {
    match (session.result_id(), session.failure()) {
        (Some(id), _) => UploadOutcome::Success(id.to_string()),
        (None, Some(reason)) => UploadOutcome::Aborted(reason.clone()),
        (None, None) => UploadOutcome::Aborted(AbortReason::Cancelled),
    }
}

//! Per-file upload session state.

use crate::driver::AbortReason;
use crate::policy::RetryPolicy;
use crate::request::TransferRequest;

/// Where an [`UploadSession`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A chunk send is due (or in flight).
    Uploading,
    /// Backing off after a transient failure.
    RetryWait,
    /// The remote side returned the item identifier. Terminal.
    Completed,
    /// Retries exhausted, fatal error, or unusable final response. Terminal.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// One upload of one file.
///
/// Owns its transfer request for its whole lifetime. `result_id` is set
/// exactly when the state is [`SessionState::Completed`].
pub struct UploadSession<R> {
    request: R,
    attempt: u32,
    state: SessionState,
    result_id: Option<String>,
    failure: Option<AbortReason>,
}

impl<R: TransferRequest> UploadSession<R> {
    /// Creates a session positioned at the start of the upload.
    pub fn new(request: R) -> Self {
        Self {
            request,
            attempt: 0,
            state: SessionState::Uploading,
            result_id: None,
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Consecutive (or, without reset, total) transient failures so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn result_id(&self) -> Option<&str> {
        self.result_id.as_deref()
    }

    /// Why the session failed, once it has.
    pub fn failure(&self) -> Option<&AbortReason> {
        self.failure.as_ref()
    }

    /// Consumes the session and hands back its transfer request.
    pub fn into_request(self) -> R {
        self.request
    }

    /// The transfer request, borrowed only while `Uploading`.
    pub(crate) fn request_mut(&mut self) -> Option<&mut R> {
        (self.state == SessionState::Uploading).then_some(&mut self.request)
    }

    pub(crate) fn chunk_accepted(&mut self, policy: &RetryPolicy) {
        if policy.reset_on_progress {
            self.attempt = 0;
        }
    }

    pub(crate) fn complete(&mut self, id: String) {
        self.result_id = Some(id);
        self.state = SessionState::Completed;
    }

    pub(crate) fn fail(&mut self, reason: AbortReason) {
        self.result_id = None;
        self.failure = Some(reason);
        self.state = SessionState::Failed;
    }

    /// Records a transient failure. Returns the new attempt number, or
    /// `None` once the ceiling is exceeded. The caller then records the
    /// failure reason with [`fail`](Self::fail).
    pub(crate) fn transient_failure(&mut self, policy: &RetryPolicy) -> Option<u32> {
        self.attempt = self.attempt.saturating_add(1);
        if policy.exhausted(self.attempt) {
            self.state = SessionState::Failed;
            None
        } else {
            self.state = SessionState::RetryWait;
            Some(self.attempt)
        }
    }

    pub(crate) fn resume(&mut self) {
        if self.state == SessionState::RetryWait {
            self.state = SessionState::Uploading;
        }
    }
}

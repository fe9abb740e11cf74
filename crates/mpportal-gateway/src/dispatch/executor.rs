//! Deadline executor.
//!
//! The platform waits a few seconds for a passive reply and retries the push
//! when it gets nothing. The executor runs the reply work on its own task and
//! races it against the deadline: whichever finishes first decides the
//! response. The task is aborted whenever the caller stops waiting, so it
//! cannot write anything later.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use mpportal_core::error::Result;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How a unit of reply work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Encoded reply body, ready to write.
    Reply(Bytes),
    /// Work finished with nothing to send.
    NoReply,
    /// Deadline passed first; the work was cancelled.
    TimedOut,
    /// Work returned an error or panicked.
    Failed(String),
}

/// Aborts the task when dropped, so work never outlives the request waiting
/// on it (deadline, client disconnect, connection teardown).
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeadlineExecutor {
    deadline: Duration,
}

impl DeadlineExecutor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `work` for at most the deadline.
    ///
    /// `Ok(None)` and an empty body both mean "no reply".
    pub async fn run<F>(&self, work: F) -> Completion
    where
        F: Future<Output = Result<Option<Bytes>>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let _guard = AbortOnDrop(tokio::spawn(async move {
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send(work.await);
        }));

        tokio::select! {
            biased;
            res = rx => match res {
                Ok(Ok(Some(body))) if !body.is_empty() => Completion::Reply(body),
                Ok(Ok(_)) => Completion::NoReply,
                Ok(Err(e)) => Completion::Failed(e.to_string()),
                // Sender dropped without sending: the task panicked.
                Err(_) => Completion::Failed("reply task panicked".into()),
            },
            _ = tokio::time::sleep(self.deadline) => Completion::TimedOut,
        }
    }
}

//! Channel-based progress streaming for background cleanups.

use std::sync::Arc;

use tokio::sync::mpsc;

use cleanmate_core::{CleanError, Cleanup, ProgressEvent};

use crate::OPERATION_CHANNEL_SIZE;
use crate::service::CleanService;

/// Message sent while a background cleanup runs.
#[derive(Debug)]
pub enum CleanUpdate {
    /// A progress update.
    Progress(ProgressEvent),
    /// The pass finished, or was rejected.
    Complete(Result<Cleanup, CleanError>),
}

impl CleanUpdate {
    /// Check if this is the final message.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Start a cleanup on the runtime and return a receiver for its updates.
///
/// Progress is sent without waiting: when the channel is full or the
/// receiver is gone the update is dropped and the pass carries on. The
/// completion message is always attempted.
pub fn start_clean(service: Arc<CleanService>) -> mpsc::Receiver<CleanUpdate> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let mut sink = move |event: ProgressEvent| {
            let _ = progress_tx.try_send(CleanUpdate::Progress(event));
        };

        let result = service.clean(&mut sink).await;
        let _ = tx.send(CleanUpdate::Complete(result)).await;
    });

    rx
}

//! Forwards pipeline snapshots into a diagnostics sink.

use ci_check_core::{DiagnosticSink, DiagnosticSnapshot, SharedStream};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Running forwarder started by [`start_diagnostics`].
///
/// Dropping the handle stops forwarding; [`SinkHandle::shutdown`] additionally
/// waits until the sink has been cleared.
pub struct SinkHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SinkHandle {
    /// Stops forwarding and waits for the sink to be cleared.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("diagnostic forwarder ended abnormally: {}", e);
        }
    }
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Subscribes `sink` to `stream`.
///
/// Every snapshot replaces the sink's contents verbatim. A pipeline failure
/// is reported to the sink once; the last good snapshot stays in place until
/// teardown. On teardown the subscription is released before the sink is
/// cleared.
pub fn start_diagnostics<K>(stream: &SharedStream<DiagnosticSnapshot>, sink: K) -> SinkHandle
where
    K: DiagnosticSink + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let mut subscription = stream.subscribe();
    let sink = Arc::new(sink);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                item = subscription.next() => match item {
                    Some(Ok(snapshot)) => sink.replace(&snapshot).await,
                    Some(Err(e)) => {
                        sink.report_failure(&e).await;
                        token.cancelled().await;
                        break;
                    }
                    None => break,
                },
            }
        }

        drop(subscription);
        sink.clear().await;
        tracing::debug!("diagnostic forwarder stopped");
    });

    SinkHandle {
        cancel,
        task: Some(task),
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info};

use crate::domain::events::DispatchResult;

/// Consumes dispatch outcomes. Runs in its own task, so a slow reporter only
/// lets results pile up in the channel; it never holds back the dispatch loop.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn report(&self, result: DispatchResult);
}

pub struct LogReporter;

#[async_trait]
impl ResultReporter for LogReporter {
    async fn report(&self, result: DispatchResult) {
        let message_id = result.message_id.map(|id| id.0).unwrap_or_default();
        match &result.error {
            Some(err) => error!(
                ticket = %result.ticket,
                recipient = %result.recipient,
                kind = result.kind,
                message_id,
                "{err}: {}",
                result.text
            ),
            None => info!(
                ticket = %result.ticket,
                recipient = %result.recipient,
                kind = result.kind,
                message_id,
                forward_date = ?result.forward_date,
                "message sent: {}",
                result.text
            ),
        }
    }
}

pub fn spawn(
    mut results: mpsc::UnboundedReceiver<DispatchResult>,
    reporter: Arc<dyn ResultReporter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            reporter.report(result).await;
        }
        debug!("result channel closed, reporter exiting");
    })
}

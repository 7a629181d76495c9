#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng};
use stickerbot::{
    DispatchLoop, DispatchResult, Dispatcher, DispatcherConfig, ForwardedMessage, MessageId,
    MessagingBackend, RecipientId, application::services::selector::FairSelector,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Sent {
    pub recipient: RecipientId,
    pub text: String,
    pub at: Instant,
}

/// Backend that remembers every call, optionally taking `delay` per send.
#[derive(Default)]
pub struct RecordingBackend {
    pub sent: Mutex<Vec<Sent>>,
    pub delay: Duration,
}

impl RecordingBackend {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    async fn record(&self, recipient: RecipientId, text: &str) -> anyhow::Result<MessageId> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent {
            recipient,
            text: text.to_string(),
            at: Instant::now(),
        });
        Ok(MessageId(sent.len() as i64))
    }
}

#[async_trait]
impl MessagingBackend for RecordingBackend {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        _thread_id: Option<i64>,
        _reply_to: Option<i64>,
        _reply_markup: Option<&serde_json::Value>,
    ) -> anyhow::Result<MessageId> {
        self.record(recipient, text).await
    }

    async fn send_formatted_text(
        &self,
        recipient: RecipientId,
        text: &str,
    ) -> anyhow::Result<MessageId> {
        self.record(recipient, text).await
    }

    async fn copy_message(
        &self,
        recipient: RecipientId,
        _from_chat: &str,
        message_id: i64,
        _thread_id: Option<i64>,
        _reply_to: Option<i64>,
    ) -> anyhow::Result<MessageId> {
        self.record(recipient, &format!("copy of {message_id}")).await
    }

    async fn forward_message(
        &self,
        recipient: RecipientId,
        _from_chat: &str,
        message_id: i64,
    ) -> anyhow::Result<ForwardedMessage> {
        let text = format!("forward of {message_id}");
        let id = self.record(recipient, &text).await?;
        Ok(ForwardedMessage {
            message_id: id,
            origin_date: None,
            text,
        })
    }
}

pub fn dispatcher(
    backend: Arc<RecordingBackend>,
    config: DispatcherConfig,
    seed: u64,
) -> (
    Dispatcher,
    DispatchLoop<StdRng>,
    mpsc::UnboundedReceiver<DispatchResult>,
) {
    Dispatcher::with_rng(
        config,
        backend,
        FairSelector::new(StdRng::seed_from_u64(seed)),
    )
}

pub fn drain(results: &mut mpsc::UnboundedReceiver<DispatchResult>) -> Vec<DispatchResult> {
    let mut out = Vec::new();
    while let Ok(result) = results.try_recv() {
        out.push(result);
    }
    out
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::value_objects::{MessageId, RecipientId};

#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    pub message_id: MessageId,
    pub origin_date: Option<DateTime<Utc>>,
    pub text: String,
}

/// Transport the dispatcher delivers through. Implementations may block on I/O;
/// the dispatch loop never issues two calls concurrently.
#[async_trait]
pub trait MessagingBackend: Send + Sync {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
        reply_markup: Option<&serde_json::Value>,
    ) -> anyhow::Result<MessageId>;

    async fn send_formatted_text(
        &self,
        recipient: RecipientId,
        text: &str,
    ) -> anyhow::Result<MessageId>;

    async fn copy_message(
        &self,
        recipient: RecipientId,
        from_chat: &str,
        message_id: i64,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
    ) -> anyhow::Result<MessageId>;

    async fn forward_message(
        &self,
        recipient: RecipientId,
        from_chat: &str,
        message_id: i64,
    ) -> anyhow::Result<ForwardedMessage>;
}

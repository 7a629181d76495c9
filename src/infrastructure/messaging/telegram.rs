use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    application::services::messenger::{ForwardedMessage, MessagingBackend},
    domain::value_objects::{MessageId, RecipientId},
};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

pub struct TelegramBackend {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

impl TelegramBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::builder()
                .user_agent("stickerbot/telegram")
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn build_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> anyhow::Result<T> {
        debug!(method, "telegram request");
        let response = self
            .http
            .post(self.build_url(method))
            .json(&params)
            .send()
            .await?;

        let payload: TelegramEnvelope<T> = response.json().await?;
        payload.into_result(method)
    }

    pub async fn get_me(&self) -> anyhow::Result<BotUser> {
        self.call("getMe", json!({})).await
    }
}

fn reply_parameters(reply_to: Option<i64>) -> Option<Value> {
    reply_to.map(|message_id| json!({ "message_id": message_id }))
}

/// Drops null fields so optional hints are left out of the request entirely.
fn params(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}

#[async_trait]
impl MessagingBackend for TelegramBackend {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
        reply_markup: Option<&Value>,
    ) -> anyhow::Result<MessageId> {
        let message: TelegramMessage = self
            .call(
                "sendMessage",
                params(json!({
                    "chat_id": recipient.0,
                    "text": text,
                    "message_thread_id": thread_id,
                    "reply_parameters": reply_parameters(reply_to),
                    "reply_markup": reply_markup,
                })),
            )
            .await?;
        Ok(MessageId(message.message_id))
    }

    async fn send_formatted_text(
        &self,
        recipient: RecipientId,
        text: &str,
    ) -> anyhow::Result<MessageId> {
        let message: TelegramMessage = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": recipient.0,
                    "text": text,
                    "parse_mode": "HTML",
                    "link_preview_options": { "is_disabled": true },
                }),
            )
            .await?;
        Ok(MessageId(message.message_id))
    }

    async fn copy_message(
        &self,
        recipient: RecipientId,
        from_chat: &str,
        message_id: i64,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
    ) -> anyhow::Result<MessageId> {
        let copied: TelegramMessageRef = self
            .call(
                "copyMessage",
                params(json!({
                    "chat_id": recipient.0,
                    "from_chat_id": from_chat,
                    "message_id": message_id,
                    "message_thread_id": thread_id,
                    "reply_parameters": reply_parameters(reply_to),
                })),
            )
            .await?;
        Ok(MessageId(copied.message_id))
    }

    async fn forward_message(
        &self,
        recipient: RecipientId,
        from_chat: &str,
        message_id: i64,
    ) -> anyhow::Result<ForwardedMessage> {
        let message: TelegramMessage = self
            .call(
                "forwardMessage",
                json!({
                    "chat_id": recipient.0,
                    "from_chat_id": from_chat,
                    "message_id": message_id,
                }),
            )
            .await?;

        Ok(ForwardedMessage {
            message_id: MessageId(message.message_id),
            origin_date: message
                .forward_origin
                .and_then(|origin| DateTime::<Utc>::from_timestamp(origin.date, 0)),
            text: message.text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TelegramEnvelope<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

impl<T> TelegramEnvelope<T> {
    fn into_result(self, method: &str) -> anyhow::Result<T> {
        if !self.ok {
            anyhow::bail!(
                "telegram {method} returned error: {}",
                self.description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        self.result
            .ok_or_else(|| anyhow::anyhow!("telegram {method}: empty result"))
    }
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    text: Option<String>,
    forward_origin: Option<TelegramForwardOrigin>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageRef {
    message_id: i64,
}

/// All origin kinds (user, hidden user, chat, channel) carry `date`.
#[derive(Debug, Deserialize)]
struct TelegramForwardOrigin {
    date: i64,
}

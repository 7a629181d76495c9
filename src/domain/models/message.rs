use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{RecipientId, Ticket};

/// Payload of an outbound message. Each variant maps onto one backend call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    PlainText {
        text: String,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
        /// Passed through to the platform untouched.
        reply_markup: Option<serde_json::Value>,
    },
    /// HTML formatted, link previews disabled.
    FormattedText { text: String },
    Copy {
        from_chat: String,
        message_id: i64,
        thread_id: Option<i64>,
        reply_to: Option<i64>,
    },
    Forward { from_chat: String, message_id: i64 },
}

impl MessageContent {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::PlainText { .. } => "plain_text",
            MessageContent::FormattedText { .. } => "formatted_text",
            MessageContent::Copy { .. } => "copy",
            MessageContent::Forward { .. } => "forward",
        }
    }

    /// Text known before sending. Copies and forwards only learn theirs from the platform.
    pub fn text(&self) -> &str {
        match self {
            MessageContent::PlainText { text, .. } | MessageContent::FormattedText { text } => {
                text
            }
            MessageContent::Copy { .. } | MessageContent::Forward { .. } => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundMessage {
    pub recipient: RecipientId,
    pub content: MessageContent,
}

impl OutboundMessage {
    pub fn text(recipient: RecipientId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            content: MessageContent::PlainText {
                text: text.into(),
                thread_id: None,
                reply_to: None,
                reply_markup: None,
            },
        }
    }

    pub fn formatted(recipient: RecipientId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            content: MessageContent::FormattedText { text: text.into() },
        }
    }

    pub fn copy(recipient: RecipientId, from_chat: impl Into<String>, message_id: i64) -> Self {
        Self {
            recipient,
            content: MessageContent::Copy {
                from_chat: from_chat.into(),
                message_id,
                thread_id: None,
                reply_to: None,
            },
        }
    }

    pub fn forward(recipient: RecipientId, from_chat: impl Into<String>, message_id: i64) -> Self {
        Self {
            recipient,
            content: MessageContent::Forward {
                from_chat: from_chat.into(),
                message_id,
            },
        }
    }
}

/// A message sitting in a recipient queue, tagged with the ticket handed to its producer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub ticket: Ticket,
    pub message: OutboundMessage,
}

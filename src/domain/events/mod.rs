use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    errors::DispatchError,
    value_objects::{MessageId, RecipientId, Ticket},
};

/// Outcome of one dispatch attempt. Exactly one is emitted per dispatched message.
#[derive(Debug, Serialize)]
pub struct DispatchResult {
    pub ticket: Ticket,
    pub recipient: RecipientId,
    pub kind: &'static str,
    pub message_id: Option<MessageId>,
    /// What was sent; for forwards this is the text the platform resolved.
    pub text: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<DispatchError>,
    /// Original send date of a forwarded message.
    pub forward_date: Option<DateTime<Utc>>,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S>(error: &Option<DispatchError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

use thiserror::Error;

use crate::domain::value_objects::RecipientId;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue for recipient {recipient} is full ({capacity} messages pending)")]
    QueueOverflow {
        recipient: RecipientId,
        capacity: usize,
    },
    #[error("send to recipient {recipient} failed: {reason}")]
    SendFailure {
        recipient: RecipientId,
        reason: String,
    },
}

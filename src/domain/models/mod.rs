pub mod message;

pub use message::{MessageContent, OutboundMessage, QueuedMessage};

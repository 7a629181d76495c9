pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::handlers::message_dispatcher::{
    DispatchLoop, Dispatcher, DispatcherConfig, FailedSendPolicy,
};
pub use application::handlers::result_reporter::{LogReporter, ResultReporter};
pub use application::services::messenger::{ForwardedMessage, MessagingBackend};
pub use domain::{
    errors::DispatchError,
    events::DispatchResult,
    models::{MessageContent, OutboundMessage},
    value_objects::{MessageId, RecipientId, Ticket},
};

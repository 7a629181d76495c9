pub mod message_dispatcher;
pub mod result_reporter;

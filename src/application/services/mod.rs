pub mod cooldown;
pub mod messenger;
pub mod queue_registry;
pub mod selector;

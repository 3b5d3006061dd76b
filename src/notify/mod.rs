//! Change notification: listener fan-out and topic channels.

pub mod listener;
pub mod topic;

pub use listener::{ListenerHandle, ListenerRegistry};
pub use topic::TopicBus;

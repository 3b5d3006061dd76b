//! Core coordinator types.

mod builder;
mod coordinator;
mod fetch;

pub use builder::{CoordinatorBuilder, DEFAULT_FAILURE_THRESHOLD};
pub use coordinator::Coordinator;
pub use fetch::{Fetch, FetchFn};

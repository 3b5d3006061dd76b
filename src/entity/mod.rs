//! Entities: the per-device views derived from a shared snapshot.

mod binding;
mod model;

pub use binding::EntityBinding;
pub use model::{Entity, EntityState, EntityValue, StateChange};

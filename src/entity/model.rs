//! The entity capability interface and its published state types.

use serde::{Deserialize, Serialize};

/// A value published by an entity, as a tagged variant.
///
/// Device families resolve which variant they emit at construction time
/// instead of being probed for attributes at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityValue {
    /// Binary state (contact sensors, switches, locks).
    Bool(bool),
    /// Numeric measurement (temperature, power, battery level).
    Number(f64),
    /// Free-form text (alarm mode, firmware version).
    Text(String),
}

/// The state an entity publishes to the hub runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityState {
    /// The coordinator has no snapshot yet, or has stopped being ready.
    Unavailable,
    /// The snapshot is present but carries no value for this entity's key.
    /// Not an error; the device may simply not have reported yet.
    Unknown,
    /// A live value derived from the current snapshot.
    Value(EntityValue),
}

impl EntityState {
    /// The contained value, if the state carries one.
    pub fn value(&self) -> Option<&EntityValue> {
        match self {
            EntityState::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Capability set every entity exposes over a shared snapshot type `T`.
///
/// Implementations are thin: they select one field of the snapshot and
/// apply at most a unit conversion. No I/O happens here — the snapshot has
/// already been fetched by the coordinator.
///
/// # Examples
///
/// ```rust
/// use pollcast::entity::{Entity, EntityValue};
/// use std::collections::HashMap;
///
/// struct TempSensor;
///
/// impl Entity<HashMap<String, f64>> for TempSensor {
///     fn identifier(&self) -> &str {
///         "living_room_temp"
///     }
///
///     fn display_name(&self) -> &str {
///         "Living Room Temperature"
///     }
///
///     fn current_value(&self, snapshot: &HashMap<String, f64>) -> Option<EntityValue> {
///         snapshot.get("temp").map(|v| EntityValue::Number(*v))
///     }
/// }
/// ```
pub trait Entity<T>: Send + Sync {
    /// Stable unique id of this entity within its integration instance.
    fn identifier(&self) -> &str;

    /// Human-readable name shown by the hub.
    fn display_name(&self) -> &str;

    /// Derive this entity's value from the shared snapshot.
    ///
    /// `None` means the field is absent for this entity's key and the state
    /// is "currently unknown".
    fn current_value(&self, snapshot: &T) -> Option<EntityValue>;
}

/// Payload published on a topic bus when an entity's state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Identifier of the entity whose state changed.
    pub entity_id: String,
    /// The newly published state.
    pub state: EntityState,
}

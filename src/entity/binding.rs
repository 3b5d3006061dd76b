//! Attach/detach glue between an entity and its coordinator.

use crate::core::Coordinator;
use crate::entity::model::{Entity, EntityState, StateChange};
use crate::notify::{ListenerHandle, TopicBus};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::warn;

/// Binds one entity to a coordinator for the entity's active lifetime.
///
/// [`attach`](EntityBinding::attach) registers a listener that re-derives
/// the entity's published state from the shared snapshot after every
/// successful refresh and, when a state topic is configured, publishes a
/// [`StateChange`] so the runtime re-renders. [`detach`](EntityBinding::detach)
/// removes the listener; dropping the binding detaches unconditionally, so
/// release is guaranteed even when activation is abandoned partway.
///
/// The listener performs no I/O: it reads the already-fetched snapshot and
/// selects this entity's slice of it.
///
/// # Examples
///
/// ```rust,no_run
/// use pollcast::prelude::*;
/// use pollcast::entity::{Entity, EntityBinding, EntityValue};
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// # struct TempSensor;
/// # impl Entity<HashMap<String, f64>> for TempSensor {
/// #     fn identifier(&self) -> &str { "temp" }
/// #     fn display_name(&self) -> &str { "Temperature" }
/// #     fn current_value(&self, s: &HashMap<String, f64>) -> Option<EntityValue> {
/// #         s.get("temp").map(|v| EntityValue::Number(*v))
/// #     }
/// # }
/// # async fn example(coordinator: Coordinator<HashMap<String, f64>>) {
/// let mut binding = EntityBinding::new(Arc::new(TempSensor), coordinator);
/// binding.attach();
///
/// // ... entity is live; binding.state() tracks the snapshot ...
///
/// binding.detach();
/// # }
/// ```
pub struct EntityBinding<T> {
    entity: Arc<dyn Entity<T>>,
    coordinator: Coordinator<T>,
    state: Arc<ArcSwap<EntityState>>,
    state_topic: Option<(TopicBus, String)>,
    listener: Option<ListenerHandle>,
}

impl<T: Send + Sync + 'static> EntityBinding<T> {
    /// Create a detached binding.
    pub fn new(entity: Arc<dyn Entity<T>>, coordinator: Coordinator<T>) -> Self {
        Self {
            entity,
            coordinator,
            state: Arc::new(ArcSwap::from_pointee(EntityState::Unavailable)),
            state_topic: None,
            listener: None,
        }
    }

    /// Publish a [`StateChange`] on `topic` every time this entity's state
    /// is re-derived.
    pub fn with_state_topic(mut self, bus: TopicBus, topic: impl Into<String>) -> Self {
        self.state_topic = Some((bus, topic.into()));
        self
    }

    /// Activate the entity: register the coordinator listener and prime the
    /// published state from the current snapshot.
    ///
    /// Attaching an already-attached binding is a no-op.
    pub fn attach(&mut self) {
        if self.listener.is_some() {
            return;
        }

        let entity = Arc::clone(&self.entity);
        let coordinator = self.coordinator.clone();
        let state = Arc::clone(&self.state);
        let state_topic = self.state_topic.clone();

        self.refresh_state();

        self.listener = Some(self.coordinator.add_listener(move || {
            let new_state = derive_state(entity.as_ref(), &coordinator);
            state.store(Arc::new(new_state.clone()));
            publish_state(&state_topic, entity.identifier(), new_state);
        }));
    }

    /// Deactivate the entity: remove the listener. Idempotent; also runs on
    /// drop.
    pub fn detach(&mut self) {
        self.listener = None;
    }

    /// Whether the binding currently holds a registered listener.
    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// The entity's currently published state.
    ///
    /// A coordinator that has crossed its failure threshold overrides the
    /// cached value: entities of a not-ready coordinator report
    /// [`EntityState::Unavailable`] instead of a stale reading.
    pub fn state(&self) -> EntityState {
        if !self.coordinator.is_ready() {
            return EntityState::Unavailable;
        }
        self.state.load().as_ref().clone()
    }

    /// The bound entity.
    pub fn entity(&self) -> &dyn Entity<T> {
        self.entity.as_ref()
    }

    /// Re-derive and publish the state from the current snapshot.
    fn refresh_state(&self) {
        let new_state = derive_state(self.entity.as_ref(), &self.coordinator);
        self.state.store(Arc::new(new_state.clone()));
        publish_state(&self.state_topic, self.entity.identifier(), new_state);
    }
}

fn derive_state<T: Send + Sync + 'static>(
    entity: &dyn Entity<T>,
    coordinator: &Coordinator<T>,
) -> EntityState {
    match coordinator.data() {
        None => EntityState::Unavailable,
        Some(snapshot) => match entity.current_value(&snapshot) {
            Some(value) => EntityState::Value(value),
            None => EntityState::Unknown,
        },
    }
}

fn publish_state(topic: &Option<(TopicBus, String)>, entity_id: &str, state: EntityState) {
    if let Some((bus, topic)) = topic {
        let change = StateChange {
            entity_id: entity_id.to_string(),
            state,
        };
        if let Err(err) = bus.publish(topic, change) {
            warn!(entity = entity_id, error = %err, "failed to publish state change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::model::EntityValue;
    use std::collections::HashMap;

    struct FieldSensor {
        id: &'static str,
        field: &'static str,
    }

    impl Entity<HashMap<String, f64>> for FieldSensor {
        fn identifier(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.id
        }

        fn current_value(&self, snapshot: &HashMap<String, f64>) -> Option<EntityValue> {
            snapshot.get(self.field).map(|v| EntityValue::Number(*v))
        }
    }

    fn coordinator() -> Coordinator<HashMap<String, f64>> {
        Coordinator::builder()
            .with_name("binding-test")
            .with_fetch_fn(|| async {
                let mut data = HashMap::new();
                data.insert("temp".to_string(), 21.5);
                Ok(data)
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unavailable_before_first_refresh() {
        let coordinator = coordinator();
        let mut binding = EntityBinding::new(
            Arc::new(FieldSensor {
                id: "t1",
                field: "temp",
            }),
            coordinator,
        );
        binding.attach();
        assert_eq!(binding.state(), EntityState::Unavailable);
    }

    #[tokio::test]
    async fn listener_updates_state_on_refresh() {
        let coordinator = coordinator();
        let mut binding = EntityBinding::new(
            Arc::new(FieldSensor {
                id: "t1",
                field: "temp",
            }),
            coordinator.clone(),
        );
        binding.attach();

        coordinator.request_refresh().await.unwrap();
        assert_eq!(
            binding.state(),
            EntityState::Value(EntityValue::Number(21.5))
        );
    }

    #[tokio::test]
    async fn absent_field_is_unknown() {
        let coordinator = coordinator();
        let mut binding = EntityBinding::new(
            Arc::new(FieldSensor {
                id: "h1",
                field: "humidity",
            }),
            coordinator.clone(),
        );
        binding.attach();

        coordinator.request_refresh().await.unwrap();
        assert_eq!(binding.state(), EntityState::Unknown);
    }

    #[tokio::test]
    async fn detach_stops_updates() {
        let coordinator = coordinator();
        let mut binding = EntityBinding::new(
            Arc::new(FieldSensor {
                id: "t1",
                field: "temp",
            }),
            coordinator.clone(),
        );
        binding.attach();
        assert_eq!(coordinator.listener_count(), 1);

        binding.detach();
        assert!(!binding.is_attached());
        assert_eq!(coordinator.listener_count(), 0);

        coordinator.request_refresh().await.unwrap();
        // Cached state never saw the refresh.
        assert_eq!(binding.state(), EntityState::Unavailable);
    }

    #[tokio::test]
    async fn drop_detaches() {
        let coordinator = coordinator();
        {
            let mut binding = EntityBinding::new(
                Arc::new(FieldSensor {
                    id: "t1",
                    field: "temp",
                }),
                coordinator.clone(),
            );
            binding.attach();
            assert_eq!(coordinator.listener_count(), 1);
        }
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[tokio::test]
    async fn attach_twice_registers_once() {
        let coordinator = coordinator();
        let mut binding = EntityBinding::new(
            Arc::new(FieldSensor {
                id: "t1",
                field: "temp",
            }),
            coordinator.clone(),
        );
        binding.attach();
        binding.attach();
        assert_eq!(coordinator.listener_count(), 1);
    }
}

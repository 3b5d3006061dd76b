//! Integration tests for entity bindings, the topic bus, and the instance
//! registry, exercising a small alarm-panel device family end to end.

use pollcast::entity::{Entity, EntityBinding, EntityState, EntityValue, StateChange};
use pollcast::notify::TopicBus;
use pollcast::prelude::*;
use pollcast::registry::InstanceRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Snapshot of one alarm panel's remote state.
#[derive(Debug, Clone)]
struct AlarmSnapshot {
    arm_mode: String,
    locks: HashMap<String, bool>,
    temperature: Option<f64>,
}

/// Device families exposed by the alarm integration, resolved to a variant
/// at construction time.
enum AlarmEntity {
    ArmMode,
    Lock { id: String, name: String },
    Temperature,
}

impl Entity<AlarmSnapshot> for AlarmEntity {
    fn identifier(&self) -> &str {
        match self {
            AlarmEntity::ArmMode => "alarm_mode",
            AlarmEntity::Lock { id, .. } => id,
            AlarmEntity::Temperature => "panel_temperature",
        }
    }

    fn display_name(&self) -> &str {
        match self {
            AlarmEntity::ArmMode => "Alarm Mode",
            AlarmEntity::Lock { name, .. } => name,
            AlarmEntity::Temperature => "Panel Temperature",
        }
    }

    fn current_value(&self, snapshot: &AlarmSnapshot) -> Option<EntityValue> {
        match self {
            AlarmEntity::ArmMode => Some(EntityValue::Text(snapshot.arm_mode.clone())),
            AlarmEntity::Lock { id, .. } => {
                snapshot.locks.get(id).map(|locked| EntityValue::Bool(*locked))
            }
            AlarmEntity::Temperature => snapshot.temperature.map(EntityValue::Number),
        }
    }
}

fn panel_coordinator(offline: Arc<AtomicBool>) -> Coordinator<AlarmSnapshot> {
    Coordinator::builder()
        .with_name("alarm-panel")
        .with_failure_threshold(1)
        .with_fetch_fn(move || {
            let offline = Arc::clone(&offline);
            async move {
                if offline.load(Ordering::SeqCst) {
                    return Err(FetchError::Transport("panel unreachable".to_string()));
                }
                let mut locks = HashMap::new();
                locks.insert("front_door".to_string(), true);
                Ok(AlarmSnapshot {
                    arm_mode: "armed_home".to_string(),
                    locks,
                    temperature: None,
                })
            }
        })
        .build()
        .expect("fetcher configured")
}

#[tokio::test]
async fn entities_derive_their_states_from_one_snapshot() {
    let coordinator = panel_coordinator(Arc::new(AtomicBool::new(false)));

    let mut mode = EntityBinding::new(Arc::new(AlarmEntity::ArmMode), coordinator.clone());
    let mut lock = EntityBinding::new(
        Arc::new(AlarmEntity::Lock {
            id: "front_door".to_string(),
            name: "Front Door".to_string(),
        }),
        coordinator.clone(),
    );
    let mut temp = EntityBinding::new(Arc::new(AlarmEntity::Temperature), coordinator.clone());
    mode.attach();
    lock.attach();
    temp.attach();

    // Nothing fetched yet: everything is unavailable.
    assert_eq!(mode.state(), EntityState::Unavailable);

    coordinator.refresh_now().await.expect("first refresh");

    assert_eq!(
        mode.state(),
        EntityState::Value(EntityValue::Text("armed_home".to_string()))
    );
    assert_eq!(lock.state(), EntityState::Value(EntityValue::Bool(true)));
    // The panel never reported a temperature: unknown, not an error.
    assert_eq!(temp.state(), EntityState::Unknown);
}

#[tokio::test]
async fn entities_go_unavailable_when_coordinator_stops_being_ready() {
    let offline = Arc::new(AtomicBool::new(false));
    let coordinator = panel_coordinator(Arc::clone(&offline));

    let mut mode = EntityBinding::new(Arc::new(AlarmEntity::ArmMode), coordinator.clone());
    mode.attach();

    coordinator.refresh_now().await.expect("first refresh");
    assert!(matches!(mode.state(), EntityState::Value(_)));

    // Threshold is 1: a single failed poll flips the coordinator.
    offline.store(true, Ordering::SeqCst);
    let _ = coordinator.request_refresh().await;

    assert!(!coordinator.is_ready());
    assert_eq!(mode.state(), EntityState::Unavailable);

    // Last-known-good data is still there for when it recovers.
    assert!(coordinator.data().is_some());
    offline.store(false, Ordering::SeqCst);
    coordinator.request_refresh().await.expect("recovered");
    assert!(matches!(mode.state(), EntityState::Value(_)));
}

#[tokio::test]
async fn state_changes_are_published_on_the_topic_bus() {
    let coordinator = panel_coordinator(Arc::new(AtomicBool::new(false)));
    let bus = TopicBus::new();
    let mut rx = bus
        .subscribe::<StateChange>("entity/state")
        .expect("fresh topic");

    let mut mode = EntityBinding::new(Arc::new(AlarmEntity::ArmMode), coordinator.clone())
        .with_state_topic(bus.clone(), "entity/state");
    mode.attach();

    // Attach primes the state and publishes the initial (unavailable) view.
    let initial = rx.recv().await.expect("initial publish");
    assert_eq!(initial.entity_id, "alarm_mode");
    assert_eq!(initial.state, EntityState::Unavailable);

    coordinator.refresh_now().await.expect("first refresh");

    let change = rx.recv().await.expect("refresh publish");
    assert_eq!(change.entity_id, "alarm_mode");
    assert_eq!(
        change.state,
        EntityState::Value(EntityValue::Text("armed_home".to_string()))
    );
}

#[tokio::test]
async fn registry_covers_setup_and_unload() {
    let registry = InstanceRegistry::new();
    let coordinator = panel_coordinator(Arc::new(AtomicBool::new(false)));

    // Setup: first refresh, then register the instance.
    coordinator.refresh_now().await.expect("first refresh");
    registry
        .insert("alarm:panel-1", coordinator.clone())
        .expect("fresh key");

    let found = registry
        .get::<AlarmSnapshot>("alarm:panel-1")
        .expect("registered");
    assert_eq!(found.name(), "alarm-panel");
    assert!(found.data().is_some());

    // Unload: remove, then shut down.
    let removed = registry
        .remove::<AlarmSnapshot>("alarm:panel-1")
        .expect("still registered");
    removed.shutdown();

    assert!(!registry.contains("alarm:panel-1"));
    assert!(matches!(
        coordinator.request_refresh().await,
        Err(CoordinatorError::ShutDown)
    ));
}

#[tokio::test]
async fn listener_fires_synchronously_with_refresh_resolution() {
    // Scenario from the polling contract: interval-configured coordinator,
    // fetch resolves with {"temp": 21.5}, a registered listener observes the
    // snapshot exactly once, synchronously after the refresh resolves.
    let coordinator = Coordinator::builder()
        .with_name("weather")
        .with_interval(Duration::from_secs(30))
        .with_fetch_fn(|| async {
            let mut data = HashMap::new();
            data.insert("temp".to_string(), 21.5);
            Ok(data)
        })
        .build()
        .expect("fetcher configured");

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let _listener = coordinator.add_listener({
        let seen = Arc::clone(&seen);
        let coordinator = coordinator.clone();
        move || {
            let snapshot = coordinator.data().expect("notified after success");
            seen.lock().unwrap().push(snapshot.get("temp").copied());
        }
    });

    coordinator.refresh_now().await.expect("refresh");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[Some(21.5)]);
    coordinator.shutdown();
}

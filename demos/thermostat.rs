//! Demo: a polled thermostat integration with two entities.
//!
//! Run with: cargo run --example thermostat

use pollcast::entity::{Entity, EntityBinding, EntityValue, StateChange};
use pollcast::notify::TopicBus;
use pollcast::prelude::*;
use pollcast::registry::InstanceRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FieldEntity {
    id: &'static str,
    name: &'static str,
    field: &'static str,
}

impl Entity<HashMap<String, f64>> for FieldEntity {
    fn identifier(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.name
    }

    fn current_value(&self, snapshot: &HashMap<String, f64>) -> Option<EntityValue> {
        snapshot.get(self.field).map(|v| EntityValue::Number(*v))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stand-in for a vendor SDK: each poll reports a slowly drifting
    // temperature and a humidity reading.
    let polls = Arc::new(AtomicUsize::new(0));
    let coordinator = Coordinator::builder()
        .with_name("thermostat")
        .with_interval(Duration::from_secs(2))
        .with_fetch_fn({
            let polls = Arc::clone(&polls);
            move || {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let mut data = HashMap::new();
                    data.insert("temp".to_string(), 20.0 + n as f64 * 0.5);
                    data.insert("humidity".to_string(), 40.0);
                    Ok(data)
                }
            }
        })
        .build()?;

    // Setup: first refresh must succeed before the integration is ready.
    coordinator.refresh_now().await?;

    let registry = InstanceRegistry::new();
    registry.insert("thermostat:living-room", coordinator.clone())?;

    // Entities publish their state changes on a shared topic.
    let bus = TopicBus::new();
    let mut rx = bus.subscribe::<StateChange>("entity/state")?;

    let mut temp = EntityBinding::new(
        Arc::new(FieldEntity {
            id: "living_room_temp",
            name: "Living Room Temperature",
            field: "temp",
        }),
        coordinator.clone(),
    )
    .with_state_topic(bus.clone(), "entity/state");
    temp.attach();

    let mut humidity = EntityBinding::new(
        Arc::new(FieldEntity {
            id: "living_room_humidity",
            name: "Living Room Humidity",
            field: "humidity",
        }),
        coordinator.clone(),
    )
    .with_state_topic(bus.clone(), "entity/state");
    humidity.attach();

    println!("polling every 2s; watching state changes for 7s\n");

    let watch = tokio::time::timeout(Duration::from_secs(7), async {
        while let Ok(change) = rx.recv().await {
            println!("{:<24} -> {:?}", change.entity_id, change.state);
        }
    });
    let _ = watch.await;

    // Unload: detach entities, remove the instance, stop polling.
    temp.detach();
    humidity.detach();
    if let Some(coordinator) = registry.remove::<HashMap<String, f64>>("thermostat:living-room") {
        coordinator.shutdown();
    }

    println!("\ncompleted {} polls", polls.load(Ordering::SeqCst));
    Ok(())
}

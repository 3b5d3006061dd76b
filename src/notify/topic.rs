//! Typed publish/subscribe channels keyed by topic string.

use crate::error::{CoordinatorError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Publish/subscribe bus with one typed broadcast channel per topic.
///
/// The payload type of a topic is fixed by whichever call touches it first;
/// using the same topic with a different type is an error rather than a
/// silently miscast signal. The bus is cheap to clone and all clones share
/// the same channels.
///
/// # Examples
///
/// ```rust
/// use pollcast::notify::TopicBus;
///
/// # fn example() -> pollcast::error::Result<()> {
/// let bus = TopicBus::new();
///
/// let mut rx = bus.subscribe::<String>("zone/kitchen")?;
/// bus.publish("zone/kitchen", "motion".to_string())?;
///
/// assert_eq!(rx.try_recv().unwrap(), "motion");
/// # Ok(())
/// # }
/// ```
pub struct TopicBus {
    channels: Arc<Mutex<HashMap<String, Box<dyn Any + Send>>>>,
    capacity: usize,
}

impl TopicBus {
    /// Create a bus with the default per-topic channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose per-topic channels buffer `capacity` payloads for
    /// slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a topic with payload type `P`.
    ///
    /// Creates the channel on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::TopicTypeMismatch`] if the topic already
    /// carries a different payload type.
    pub fn subscribe<P>(&self, topic: &str) -> Result<broadcast::Receiver<P>>
    where
        P: Clone + Send + 'static,
    {
        let sender = self.sender::<P>(topic)?;
        Ok(sender.subscribe())
    }

    /// Publish a payload to a topic, returning how many subscribers received
    /// it.
    ///
    /// Publishing to a topic with no subscribers is not an error; the
    /// payload is simply dropped and `0` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::TopicTypeMismatch`] if the topic already
    /// carries a different payload type.
    pub fn publish<P>(&self, topic: &str, payload: P) -> Result<usize>
    where
        P: Clone + Send + 'static,
    {
        let sender = self.sender::<P>(topic)?;
        Ok(sender.send(payload).unwrap_or(0))
    }

    /// Number of topics with a live channel.
    pub fn topic_count(&self) -> usize {
        self.lock_channels().len()
    }

    fn sender<P>(&self, topic: &str) -> Result<broadcast::Sender<P>>
    where
        P: Clone + Send + 'static,
    {
        let mut channels = self.lock_channels();
        match channels.get(topic) {
            Some(entry) => entry
                .downcast_ref::<broadcast::Sender<P>>()
                .cloned()
                .ok_or_else(|| CoordinatorError::TopicTypeMismatch {
                    topic: topic.to_string(),
                }),
            None => {
                let (tx, _rx) = broadcast::channel::<P>(self.capacity);
                channels.insert(topic.to_string(), Box::new(tx.clone()));
                Ok(tx)
            }
        }
    }

    fn lock_channels(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Box<dyn Any + Send>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TopicBus {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
            capacity: self.capacity,
        }
    }
}

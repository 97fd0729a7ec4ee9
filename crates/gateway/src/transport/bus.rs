//! Ordered, failure-isolated topic bus
//!
//! Each topic keeps its subscribers in registration order. A subscriber that
//! panics is logged and skipped; the remaining subscribers still receive the
//! message. The last message per topic is cached and replayed to late
//! subscribers.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::error;

/// Subscriber callback
pub type Callback<M> = Box<dyn FnMut(&M) + Send>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub topic: String,
    id: u64,
}

/// Outcome of a publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

struct Subscriber<M> {
    id: u64,
    callback: Callback<M>,
}

pub struct TopicBus<M> {
    topics: HashMap<String, Vec<Subscriber<M>>>,
    last: HashMap<String, M>,
    next_id: u64,
}

impl<M> Default for TopicBus<M> {
    fn default() -> Self {
        Self {
            topics: HashMap::new(),
            last: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<M> TopicBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback on `topic`
    ///
    /// If a message was already published on the topic it is replayed to the
    /// new subscriber immediately.
    pub fn subscribe(&mut self, topic: &str, callback: Callback<M>) -> Subscription {
        self.next_id += 1;
        let mut subscriber = Subscriber {
            id: self.next_id,
            callback,
        };

        if let Some(cached) = self.last.get(topic) {
            if !invoke(&mut subscriber, topic, cached) {
                error!("[FEED] Replay to subscriber {} on {} failed", subscriber.id, topic);
            }
        }

        let handle = Subscription {
            topic: topic.to_string(),
            id: subscriber.id,
        };
        self.topics.entry(topic.to_string()).or_default().push(subscriber);
        handle
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        let Some(subscribers) = self.topics.get_mut(&subscription.topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != subscription.id);
        before != subscribers.len()
    }

    /// Deliver `message` to every subscriber of `topic`, in order, then cache it
    pub fn publish(&mut self, topic: &str, message: M) -> Delivery {
        let mut delivery = Delivery::default();
        if let Some(subscribers) = self.topics.get_mut(topic) {
            for subscriber in subscribers.iter_mut() {
                if invoke(subscriber, topic, &message) {
                    delivery.delivered += 1;
                } else {
                    delivery.failed += 1;
                }
            }
        }
        self.last.insert(topic.to_string(), message);
        delivery
    }

    /// Last message published on `topic`
    pub fn last(&self, topic: &str) -> Option<&M> {
        self.last.get(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Drop cached messages (subscribers are kept)
    pub fn clear_cache(&mut self) {
        self.last.clear();
    }
}

fn invoke<M>(subscriber: &mut Subscriber<M>, topic: &str, message: &M) -> bool {
    let callback = &mut subscriber.callback;
    match catch_unwind(AssertUnwindSafe(|| callback(message))) {
        Ok(()) => true,
        Err(_) => {
            error!(
                "[FEED] Subscriber {} on {} panicked; skipping",
                subscriber.id, topic
            );
            false
        }
    }
}

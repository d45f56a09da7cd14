use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use crate::broker::message::BrokerMessage;

pub type SubscriptionId = u64;

/// One subscribed topic pattern and the local subscribers attached to it.
///
/// Subscribers are per-subscription unbounded queues; delivery preserves
/// the order messages were routed in.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    subscribers: HashMap<SubscriptionId, UnboundedSender<BrokerMessage>>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, id: SubscriptionId, sender: UnboundedSender<BrokerMessage>) {
        self.subscribers.insert(id, sender);
    }

    /// If the subscription is not attached, it has no effect.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.remove(&id);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver a message to every live subscriber, dropping the ones whose
    /// receiving side has gone away.
    pub fn deliver(&mut self, message: &BrokerMessage) {
        self.subscribers
            .retain(|_, sender| sender.send(message.clone()).is_ok());
    }
}

/// Match a destination against a subscription pattern.
///
/// Patterns are dot-separated; `*` matches exactly one segment and a
/// trailing `>` matches one or more remaining segments.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split('.');
    let mut topic_segments = topic.split('.');
    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (None, None) => return true,
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            _ => return false,
        }
    }
}

use std::sync::Weak;

use crate::broker::client::BrokerInner;
use crate::broker::topic::SubscriptionId;

/// Handle to one active broker subscription.
///
/// Cancellation is explicit: dropping the handle leaves the subscription
/// running. The only implicit teardown path is losing the broker
/// connection, which completes every subscription at once.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    pattern: String,
    client: Weak<BrokerInner>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, pattern: String, client: Weak<BrokerInner>) -> Self {
        Self {
            id,
            pattern,
            client,
        }
    }

    /// The topic pattern this subscription was created with.
    pub fn topic(&self) -> &str {
        &self.pattern
    }

    /// Cancel the subscription and complete its receiver. Safe to call
    /// after the connection is gone.
    pub fn cancel(&self) {
        if let Some(client) = self.client.upgrade() {
            client.unsubscribe(&self.pattern, self.id);
        }
    }
}

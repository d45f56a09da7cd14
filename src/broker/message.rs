use serde::{Deserialize, Serialize};

/// A message crossing the broker boundary.
///
/// Consists of the topic it was published on, the serialized payload
/// (commonly JSON), and the publish timestamp in epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
}

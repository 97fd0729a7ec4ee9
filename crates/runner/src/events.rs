//! Dashboard event stream items

use meridian_core::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEventKind {
    SignalGenerated,
    SignalExecuted,
    Error,
    StatusUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub kind: PipelineEventKind,
    pub timestamp: Timestamp,
    pub payload: Value,
}

impl PipelineEvent {
    pub fn new(kind: PipelineEventKind, timestamp: Timestamp, payload: Value) -> Self {
        Self {
            kind,
            timestamp,
            payload,
        }
    }

    /// Serialize `payload`; unserializable values become `null`
    pub fn with<T: Serialize>(kind: PipelineEventKind, timestamp: Timestamp, payload: &T) -> Self {
        Self::new(
            kind,
            timestamp,
            serde_json::to_value(payload).unwrap_or(Value::Null),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_kind_wire_names() {
        let event = PipelineEvent::new(
            PipelineEventKind::SignalGenerated,
            Utc::now(),
            json!({ "symbol": "BTC" }),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "SIGNAL_GENERATED");
        assert_eq!(value["payload"]["symbol"], "BTC");
    }
}

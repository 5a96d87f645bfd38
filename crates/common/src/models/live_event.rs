use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Signal;

/// Inbound live channel message: `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    NewSignal(Signal),
    SignalUpdate(Value),
    MarketUpdate(Value),
}

impl LiveEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewSignal(_) => "new_signal",
            Self::SignalUpdate(_) => "signal_update",
            Self::MarketUpdate(_) => "market_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal_is_decoded_by_tag() {
        let raw = r#"{"type":"new_signal","data":{"symbol":"BTCUSDT","direction":"SELL","confidence":77,"entry_price":64000.5,"timestamp":"2024-05-01T10:00:00"}}"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        match event {
            LiveEvent::NewSignal(signal) => {
                assert_eq!(signal.symbol.as_deref(), Some("BTCUSDT"));
                assert_eq!(signal.entry_price, Some(64000.5));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn market_update_keeps_raw_payload() {
        let raw = r#"{"type":"market_update","data":{"EURUSD":1.0841}}"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), "market_update");
        assert_eq!(
            event,
            LiveEvent::MarketUpdate(serde_json::json!({"EURUSD": 1.0841}))
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<LiveEvent>(r#"{"type":"heartbeat","data":{}}"#).is_err());
    }
}

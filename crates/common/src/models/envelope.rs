use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape shared by every enveloped backend response: `{success, data, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ApiEnvelope<Value> {
    /// The payload, or `Value::Null` when the backend sent none.
    pub fn into_data(self) -> Value {
        self.data.unwrap_or(Value::Null)
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingError {
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("'{value}' is not a valid value for {key}")]
    InvalidValue { key: String, value: String },
}

/// User preferences kept on this machine.
///
/// Keys are camelCase on disk. Keys this version doesn't know about are kept
/// in `extra` so a save never drops them. A known key whose stored value does
/// not decode falls back to its default here, while the stored value is kept
/// in `retained` and written back by [`Settings::to_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub push_notifications: bool,
    pub email_notifications: bool,
    /// Percent. Recorded and displayed only, signals are not filtered on it.
    pub min_confidence: f64,
    pub theme: String,
    pub currency: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub retained: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            push_notifications: true,
            email_notifications: false,
            min_confidence: 70.0,
            theme: "dark".to_string(),
            currency: "USD".to_string(),
            extra: Map::new(),
            retained: Map::new(),
        }
    }
}

impl Settings {
    /// Shallow merge of a stored record over the defaults.
    ///
    /// Field by field: a stored value of the wrong type leaves the default in
    /// place instead of discarding the whole record, and is retained as is.
    pub fn merged_over_defaults(stored: &Value) -> Self {
        let Some(stored) = stored.as_object() else {
            warn!("Stored settings are not an object, using defaults");
            return Self::default();
        };

        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Self::default(),
        };

        let mut retained = Map::new();
        for (key, value) in stored {
            let previous = merged.insert(key.clone(), value.clone());
            if serde_json::from_value::<Self>(Value::Object(merged.clone())).is_err() {
                warn!("Stored setting {} = {} does not decode, using the default", key, value);
                retained.insert(key.clone(), value.clone());
                match previous {
                    Some(p) => merged.insert(key.clone(), p),
                    None => merged.remove(key),
                };
            }
        }

        let mut settings: Self = serde_json::from_value(Value::Object(merged)).unwrap_or_default();
        settings.retained = retained;
        settings
    }

    /// The record to persist: every field, with retained stored values in
    /// place of the defaults that stood in for them.
    pub fn to_record(&self) -> Result<Value, serde_json::Error> {
        let mut record = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut record {
            for (key, value) in &self.retained {
                map.insert(key.clone(), value.clone());
            }
        }
        Ok(record)
    }

    /// Updates one setting from its textual form, as typed by the user.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        let invalid = || SettingError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "pushNotifications" => self.push_notifications = parse_toggle(value).ok_or_else(invalid)?,
            "emailNotifications" => {
                self.email_notifications = parse_toggle(value).ok_or_else(invalid)?
            }
            "minConfidence" => {
                self.min_confidence = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| (0.0..=100.0).contains(v))
                    .ok_or_else(invalid)?
            }
            "theme" => self.theme = value.to_string(),
            "currency" => self.currency = value.to_uppercase(),
            other => return Err(SettingError::UnknownKey(other.to_string())),
        }
        self.retained.remove(key);
        Ok(())
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

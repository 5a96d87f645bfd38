use serde::{Deserialize, Serialize};

/// A trading signal as published by the backend.
///
/// Every field is optional: the backend omits some of them depending on the
/// endpoint (the live `new_signal` push only carries a subset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signal {
    pub symbol: Option<String>,
    pub direction: Option<String>, // "BUY" or "SELL"
    pub entry_price: Option<f64>,
    pub tp_price: Option<f64>,
    pub sl_price: Option<f64>,
    pub confidence: Option<f64>,   // percent, 0..=100
    pub risk_percent: Option<f64>, // percent, 0..=100
    pub timeframe: Option<String>,
    pub analysis: Option<String>,
    pub timestamp: Option<String>,
    pub market_type: Option<String>,
}

impl Signal {
    pub fn headline(&self) -> String {
        let symbol = self.symbol.as_deref().unwrap_or("-");
        let direction = self.direction.as_deref().unwrap_or("-");
        match self.confidence {
            Some(c) => format!("{} {} ({:.0}%)", symbol, direction, c),
            None => format!("{} {}", symbol, direction),
        }
    }
}

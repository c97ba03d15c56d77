use serde::{Deserialize, Serialize};

use super::AlertCondition;

/// One alert-trigger push message. Never persisted, never acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTriggerEvent {
    #[serde(rename = "stockAlertId")]
    pub alert_id: i64,

    #[serde(rename = "stockSymbol")]
    pub symbol: String,

    #[serde(rename = "targetPrice")]
    pub target_price: f64,

    pub above: bool,
}

impl AlertTriggerEvent {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn condition(&self) -> AlertCondition {
        AlertCondition::from_above(self.above)
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AlertCondition, AlertTriggerEvent};

/// Client-side projection of a received `AlertTriggerEvent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEntry {
    pub alert_id: i64,
    pub symbol: String,
    pub target_price: f64,
    pub above: bool,
    pub received_at: DateTime<Utc>,
}

impl NotificationEntry {
    pub fn from_event(event: AlertTriggerEvent, received_at: DateTime<Utc>) -> Self {
        Self {
            alert_id: event.alert_id,
            symbol: event.symbol,
            target_price: event.target_price,
            above: event.above,
            received_at,
        }
    }

    pub fn condition(&self) -> AlertCondition {
        AlertCondition::from_above(self.above)
    }

    /// e.g. "AAPL reached 190.50 (above)"
    pub fn headline(&self) -> String {
        format!(
            "{} reached {:.2} ({})",
            self.symbol,
            self.target_price,
            self.condition().as_str()
        )
    }
}

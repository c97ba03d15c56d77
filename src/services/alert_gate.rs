use std::sync::Arc;

use crate::{models::SessionToken, services::backend::AlertsApi};

/// Result of the existence check, keeping a failed check apart from a real
/// empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    HasAlerts,
    NoAlerts,
    CheckFailed(String),
}

impl GateOutcome {
    /// Fail-closed reading: anything but a confirmed alert means "no".
    pub fn has_alerts(&self) -> bool {
        matches!(self, GateOutcome::HasAlerts)
    }
}

/// Skips the push connection for users with zero alerts.
#[derive(Clone)]
pub struct AlertGate {
    api: Arc<dyn AlertsApi>,
}

impl AlertGate {
    pub fn new(api: Arc<dyn AlertsApi>) -> Self {
        Self { api }
    }

    pub async fn check(&self, session: &SessionToken) -> GateOutcome {
        match self.api.list_alerts(session).await {
            Ok(alerts) if alerts.is_empty() => GateOutcome::NoAlerts,
            Ok(alerts) => {
                tracing::debug!(subject = %session.subject, count = alerts.len(), "alert gate open");
                GateOutcome::HasAlerts
            }
            Err(err) => {
                tracing::warn!(subject = %session.subject, error = %err, "alert existence check failed");
                GateOutcome::CheckFailed(err.to_string())
            }
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{error::BackendError, models::{Alert, SessionToken}};

/// The slice of the backend REST API the alert surface reads.
#[async_trait]
pub trait AlertsApi: Send + Sync {
    async fn list_alerts(&self, session: &SessionToken) -> Result<Vec<Alert>, BackendError>;
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    alerts_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(http: Client, alerts_url: String, timeout: Duration) -> Self {
        Self {
            http,
            alerts_url,
            timeout,
        }
    }
}

#[async_trait]
impl AlertsApi for BackendClient {
    // GET /alerts (bearer)
    async fn list_alerts(&self, session: &SessionToken) -> Result<Vec<Alert>, BackendError> {
        let res = self
            .http
            .get(&self.alerts_url)
            .bearer_auth(&session.bearer)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let bytes = res.bytes().await?;
        serde_json::from_slice::<Vec<Alert>>(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

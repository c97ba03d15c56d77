use chrono::{DateTime, Utc};

/// Bearer credential issued by the auth provider.
///
/// Fetched fresh per mount; never refreshed. Once `expires_at` passes the
/// provider stops returning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub bearer: String,
    pub subject: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn new(bearer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            bearer: bearer.into(),
            subject: subject.into(),
            expires_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::SessionToken;

/// Auth provider seam: "get current session".
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<SessionToken>;
}

/// A session already resolved by the caller (e.g. by the request middleware).
#[derive(Debug, Clone)]
pub struct FixedSession(pub Option<SessionToken>);

#[async_trait]
impl SessionProvider for FixedSession {
    async fn current_session(&self) -> Option<SessionToken> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // provider user id
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

/// Reads the provider's access token out of the session cookie and checks it
/// (HS256, `exp` enforced). An expired or tampered token is "no session".
pub struct CookieSessionProvider {
    raw: Option<String>,
    key: DecodingKey,
}

impl CookieSessionProvider {
    pub fn new(raw: Option<String>, secret: &str) -> Self {
        Self {
            raw,
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn resolve(&self) -> Option<SessionToken> {
        let raw = self.raw.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<Claims>(raw, &self.key, &validation) {
            Ok(data) => Some(SessionToken {
                bearer: raw.to_string(),
                subject: data.claims.sub,
                expires_at: DateTime::<Utc>::from_timestamp(data.claims.exp as i64, 0),
            }),
            Err(err) => {
                tracing::debug!(error = %err, "session cookie rejected");
                None
            }
        }
    }
}

#[async_trait]
impl SessionProvider for CookieSessionProvider {
    async fn current_session(&self) -> Option<SessionToken> {
        self.resolve()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStateChange {
    SignedIn(SessionToken),
    // carries the bearer that is no longer valid
    SignedOut(String),
}

/// Auth provider seam: "on auth state change".
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthStateChange>,
    // signed-in sessions by bearer
    known: Arc<Mutex<HashMap<String, SessionToken>>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            tx,
            known: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.tx.subscribe()
    }

    /// Publishes `SignedIn` the first time a bearer shows up. Expired
    /// sessions are forgotten, so a bearer seen again after expiry counts as
    /// a new sign-in.
    pub fn observe(&self, session: &SessionToken) {
        let now = Utc::now();
        let first_seen = {
            let mut known = self.lock_known();
            known.retain(|_, s| !s.is_expired_at(now));
            known
                .insert(session.bearer.clone(), session.clone())
                .is_none()
        };

        if first_seen {
            tracing::debug!(subject = %session.subject, "session signed in");
            self.publish(AuthStateChange::SignedIn(session.clone()));
        }
    }

    pub fn publish(&self, change: AuthStateChange) {
        if let AuthStateChange::SignedOut(bearer) = &change {
            self.lock_known().remove(bearer);
        }
        // no listeners is fine
        let _ = self.tx.send(change);
    }

    fn lock_known(&self) -> MutexGuard<'_, HashMap<String, SessionToken>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

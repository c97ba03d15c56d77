//! Per-mount alert subscription lifecycle.
//!
//! `AlertSubscriber::mount` fetches the session, runs the existence gate and,
//! when the caller has alerts, keeps one server-push connection open, feeding
//! every parsed `AlertTriggerEvent` into a newest-first `NotificationList`.
//!
//! ```text
//! Idle -> GatedClosed                      (no session / no alerts)
//! Idle -> Connecting -> Open -> Closed     (unmount, or error without retry)
//!                        Open -> Reconnecting{n} -> Connecting ...
//!                                Reconnecting{n} -> Disconnected (exhausted)
//! ```
//!
//! Session and gate responses are awaited to completion and then checked
//! against the liveness flag, so a response arriving after `unmount` is a
//! no-op. An open connection is closed exactly once.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, watch, RwLock},
    time::Duration,
};

use crate::{
    error::StreamError,
    models::{AlertTriggerEvent, NotificationEntry, SessionToken},
    services::{
        alert_gate::{AlertGate, GateOutcome},
        alert_stream::{AlertConnection, AlertTransport},
        notifications::NotificationList,
        reconnect::ReconnectPolicy,
        session::SessionProvider,
    },
};

const EVENT_FANOUT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    GatedClosed,
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    Closed,
    Disconnected,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::GatedClosed | StreamState::Closed | StreamState::Disconnected
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::GatedClosed => "gated_closed",
            StreamState::Connecting => "connecting",
            StreamState::Open => "open",
            StreamState::Reconnecting { .. } => "reconnecting",
            StreamState::Closed => "closed",
            StreamState::Disconnected => "disconnected",
        }
    }
}

/// Collaborators for one subscriber.
#[derive(Clone)]
pub struct AlertDeps {
    pub session: Arc<dyn SessionProvider>,
    pub gate: AlertGate,
    pub transport: Arc<dyn AlertTransport>,
    pub policy: ReconnectPolicy,
    pub capacity: Option<usize>,
}

/// Handle to a mounted subscriber. Dropping it unmounts.
pub struct AlertSubscriber {
    unmount: watch::Sender<bool>,
    state: watch::Receiver<StreamState>,
    notifications: Arc<RwLock<NotificationList>>,
    events: broadcast::Sender<NotificationEntry>,
}

impl AlertSubscriber {
    pub fn mount(deps: AlertDeps) -> Self {
        let (unmount_tx, unmount_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(StreamState::Idle);
        let (events_tx, _) = broadcast::channel(EVENT_FANOUT_CAPACITY);
        let notifications = Arc::new(RwLock::new(NotificationList::new(deps.capacity)));

        let link = Link {
            deps,
            live: Liveness { rx: unmount_rx },
            state: state_tx,
            notifications: Arc::clone(&notifications),
            events: events_tx.clone(),
        };
        tokio::spawn(link.run());

        Self {
            unmount: unmount_tx,
            state: state_rx,
            notifications,
            events: events_tx,
        }
    }

    /// Synchronous and idempotent.
    pub fn unmount(&self) {
        self.unmount.send_replace(true);
    }

    pub fn is_mounted(&self) -> bool {
        !*self.unmount.borrow()
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Resolves with the first state matching `pred` (or the final state if
    /// the lifecycle ends first).
    pub async fn wait_for_state(&self, pred: impl Fn(&StreamState) -> bool) -> StreamState {
        wait_for_state(&mut self.state.clone(), pred).await
    }

    pub async fn notifications(&self) -> Vec<NotificationEntry> {
        self.notifications.read().await.to_vec()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEntry> {
        self.events.subscribe()
    }

    pub(crate) fn notification_list(&self) -> Arc<RwLock<NotificationList>> {
        Arc::clone(&self.notifications)
    }
}

impl Drop for AlertSubscriber {
    fn drop(&mut self) {
        self.unmount();
    }
}

pub async fn wait_for_state(
    rx: &mut watch::Receiver<StreamState>,
    pred: impl Fn(&StreamState) -> bool,
) -> StreamState {
    loop {
        let current = *rx.borrow_and_update();
        if pred(&current) {
            return current;
        }
        if rx.changed().await.is_err() {
            return *rx.borrow();
        }
    }
}

struct Liveness {
    // true once unmounted
    rx: watch::Receiver<bool>,
}

impl Liveness {
    fn is_live(&self) -> bool {
        !*self.rx.borrow()
    }

    async fn unmounted(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

enum PumpEnd {
    Unmounted,
    Ended,
    Failed(StreamError),
}

struct Link {
    deps: AlertDeps,
    live: Liveness,
    state: watch::Sender<StreamState>,
    notifications: Arc<RwLock<NotificationList>>,
    events: broadcast::Sender<NotificationEntry>,
}

impl Link {
    fn set(&self, next: StreamState) {
        tracing::debug!(state = next.label(), "alert link state");
        self.state.send_replace(next);
    }

    async fn run(mut self) {
        let end = self.lifecycle().await;
        self.set(end);
    }

    async fn lifecycle(&mut self) -> StreamState {
        let session = self.deps.session.current_session().await;
        if !self.live.is_live() {
            return StreamState::Closed;
        }
        let Some(session) = session else {
            tracing::debug!("no session, alert stream skipped");
            return StreamState::GatedClosed;
        };

        if let Some(end) = self.pass_gate(&session).await {
            return end;
        }
        self.stream(&session).await
    }

    /// `None` when the caller has alerts and the stream should open.
    async fn pass_gate(&mut self, session: &SessionToken) -> Option<StreamState> {
        let mut attempt = 0;
        loop {
            let outcome = self.deps.gate.check(session).await;
            if !self.live.is_live() {
                return Some(StreamState::Closed);
            }

            match outcome {
                GateOutcome::CheckFailed(reason) if self.deps.policy.retries() => {
                    let Some(delay) = self.deps.policy.delay_for(attempt) else {
                        tracing::warn!(%reason, attempts = attempt, "alert gate retries exhausted");
                        return Some(StreamState::Disconnected);
                    };
                    attempt += 1;
                    self.set(StreamState::Reconnecting { attempt });
                    if !self.sleep(delay).await {
                        return Some(StreamState::Closed);
                    }
                }
                // fail closed
                outcome => return (!outcome.has_alerts()).then_some(StreamState::GatedClosed),
            }
        }
    }

    async fn stream(&mut self, session: &SessionToken) -> StreamState {
        let mut attempt = 0;
        loop {
            self.set(StreamState::Connecting);

            let connected = tokio::select! {
                res = self.deps.transport.connect(session) => res,
                _ = self.live.unmounted() => return StreamState::Closed,
            };

            match connected {
                Ok(mut conn) => {
                    self.set(StreamState::Open);
                    tracing::info!(subject = %session.subject, "alert stream open");

                    let (end, frames) = self.pump(conn.as_mut()).await;
                    conn.close();

                    // a connection that never carried a frame counts as a failed attempt
                    if frames > 0 {
                        attempt = 0;
                    }

                    match end {
                        PumpEnd::Unmounted => return StreamState::Closed,
                        PumpEnd::Ended => tracing::info!("alert stream ended by server"),
                        PumpEnd::Failed(err) => {
                            tracing::warn!(error = %err, "alert stream transport error")
                        }
                    }
                }
                Err(err) => tracing::warn!(error = %err, "alert stream connect failed"),
            }

            if !self.deps.policy.retries() {
                return StreamState::Closed;
            }
            let Some(delay) = self.deps.policy.delay_for(attempt) else {
                tracing::warn!(attempts = attempt, "alert stream retries exhausted");
                return StreamState::Disconnected;
            };
            attempt += 1;
            self.set(StreamState::Reconnecting { attempt });
            if !self.sleep(delay).await {
                return StreamState::Closed;
            }
        }
    }

    /// Reads until the connection ends. Also returns how many frames arrived.
    async fn pump(&mut self, conn: &mut dyn AlertConnection) -> (PumpEnd, usize) {
        let mut frames = 0;
        loop {
            let msg = tokio::select! {
                msg = conn.next_message() => msg,
                _ = self.live.unmounted() => return (PumpEnd::Unmounted, frames),
            };

            match msg {
                Some(Ok(raw)) => {
                    frames += 1;
                    self.deliver(&raw).await;
                }
                Some(Err(err)) => return (PumpEnd::Failed(err), frames),
                None => return (PumpEnd::Ended, frames),
            }
        }
    }

    async fn deliver(&self, raw: &str) {
        match AlertTriggerEvent::parse(raw) {
            Ok(event) => {
                tracing::info!(alert_id = event.alert_id, symbol = %event.symbol, "alert triggered");
                let entry = NotificationEntry::from_event(event, Utc::now());
                self.notifications.write().await.prepend(entry.clone());
                // nobody listening is fine
                let _ = self.events.send(entry);
            }
            Err(err) => {
                tracing::warn!(error = %err, payload = %preview(raw), "dropping malformed alert event");
            }
        }
    }

    /// `false` if unmounted while waiting.
    async fn sleep(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.live.unmounted() => false,
        }
    }
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(120) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

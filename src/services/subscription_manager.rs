//! Process-wide owner of alert links.
//!
//! At most one `AlertSubscriber` runs per session bearer. Every surface that
//! wants live alerts (nav-bar bell, toast list, browser SSE) registers an
//! `AlertListener`; the link is mounted by the first listener and unmounted
//! when the last one drops or the session signs out.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};

use crate::{
    models::{NotificationEntry, SessionToken},
    services::{
        alert_gate::AlertGate,
        alert_stream::AlertTransport,
        alert_subscriber::{wait_for_state, AlertDeps, AlertSubscriber, StreamState},
        backend::AlertsApi,
        reconnect::ReconnectPolicy,
        session::{AuthStateChange, FixedSession},
    },
};

#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    gate: AlertGate,
    transport: Arc<dyn AlertTransport>,
    policy: ReconnectPolicy,
    capacity: Option<usize>,
    links: Mutex<HashMap<String, SharedLink>>,
    generations: AtomicU64,
}

struct SharedLink {
    generation: u64,
    listeners: usize,
    subscriber: AlertSubscriber,
}

impl SubscriptionManager {
    pub fn new(
        api: Arc<dyn AlertsApi>,
        transport: Arc<dyn AlertTransport>,
        policy: ReconnectPolicy,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                gate: AlertGate::new(api),
                transport,
                policy,
                capacity,
                links: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener for `session`, mounting its link if none is
    /// running. A link that already reached a terminal state is replaced by a
    /// fresh one.
    pub fn subscribe(&self, session: SessionToken) -> AlertListener {
        let inner = &self.inner;
        let key = session.bearer.clone();
        let mut links = inner.lock_links();

        let link = links
            .entry(key.clone())
            .or_insert_with(|| inner.mount_link(&session));
        if link.subscriber.state().is_terminal() {
            tracing::debug!(subject = %session.subject, "replacing finished alert link");
            *link = inner.mount_link(&session);
        }
        link.listeners += 1;

        AlertListener {
            key,
            generation: link.generation,
            manager: Arc::downgrade(inner),
            events: link.subscriber.subscribe(),
            state: link.subscriber.watch_state(),
        }
    }

    /// Notifications received so far on the session's link, newest first.
    pub async fn snapshot(&self, session: &SessionToken) -> Vec<NotificationEntry> {
        let list = self
            .inner
            .lock_links()
            .get(&session.bearer)
            .map(|link| link.subscriber.notification_list());

        match list {
            Some(list) => list.read().await.to_vec(),
            None => Vec::new(),
        }
    }

    pub fn state_of(&self, session: &SessionToken) -> Option<StreamState> {
        self.inner
            .lock_links()
            .get(&session.bearer)
            .map(|link| link.subscriber.state())
    }

    pub fn listener_count(&self, session: &SessionToken) -> usize {
        self.inner
            .lock_links()
            .get(&session.bearer)
            .map_or(0, |link| link.listeners)
    }

    pub fn link_count(&self) -> usize {
        self.inner.lock_links().len()
    }

    /// Tear the session's link down regardless of remaining listeners.
    pub fn sign_out(&self, bearer: &str) {
        if self.inner.lock_links().remove(bearer).is_some() {
            tracing::info!("session signed out, alert link closed");
        }
    }

    /// Follow auth state changes until the auth event source goes away.
    pub fn watch_auth(&self, mut changes: broadcast::Receiver<AuthStateChange>) {
        let manager = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth change listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(inner) = manager.upgrade() else { break };
                match change {
                    AuthStateChange::SignedOut(bearer) => {
                        SubscriptionManager { inner }.sign_out(&bearer)
                    }
                    // links start when a surface subscribes
                    AuthStateChange::SignedIn(_) => {}
                }
            }
        });
    }
}

impl ManagerInner {
    fn lock_links(&self) -> MutexGuard<'_, HashMap<String, SharedLink>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mount_link(&self, session: &SessionToken) -> SharedLink {
        let deps = AlertDeps {
            session: Arc::new(FixedSession(Some(session.clone()))),
            gate: self.gate.clone(),
            transport: Arc::clone(&self.transport),
            policy: self.policy,
            capacity: self.capacity,
        };

        SharedLink {
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
            listeners: 0,
            subscriber: AlertSubscriber::mount(deps),
        }
    }

    fn release(&self, key: &str, generation: u64) {
        let mut links = self.lock_links();
        let Some(link) = links.get_mut(key) else { return };
        if link.generation != generation {
            return;
        }

        link.listeners = link.listeners.saturating_sub(1);
        if link.listeners == 0 {
            tracing::debug!("last alert listener left, closing link");
            links.remove(key);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    Notification(NotificationEntry),
    Ended(StreamState),
}

/// One registered consumer of a shared link. Dropping it releases the link.
pub struct AlertListener {
    key: String,
    generation: u64,
    manager: Weak<ManagerInner>,
    events: broadcast::Receiver<NotificationEntry>,
    state: watch::Receiver<StreamState>,
}

impl AlertListener {
    /// Next notification, or `Ended` once the link reaches a terminal state
    /// and everything it delivered has been read.
    pub async fn next(&mut self) -> ListenerEvent {
        loop {
            tokio::select! {
                biased;

                res = self.events.recv() => match res {
                    Ok(entry) => return ListenerEvent::Notification(entry),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "alert listener lagged");
                    }
                    Err(RecvError::Closed) => return ListenerEvent::Ended(*self.state.borrow()),
                },

                end = wait_for_state(&mut self.state, StreamState::is_terminal) => {
                    return ListenerEvent::Ended(end);
                }
            }
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }
}

impl Drop for AlertListener {
    fn drop(&mut self) {
        if let Some(inner) = self.manager.upgrade() {
            inner.release(&self.key, self.generation);
        }
    }
}

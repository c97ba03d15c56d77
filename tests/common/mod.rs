#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use marketbell::{
    error::{BackendError, StreamError},
    models::{Alert, AlertId, SessionToken},
    services::{
        alert_gate::AlertGate,
        alert_stream::{AlertConnection, AlertTransport},
        alert_subscriber::AlertDeps,
        backend::AlertsApi,
        reconnect::ReconnectPolicy,
        session::{FixedSession, SessionProvider},
    },
};
use tokio::sync::{mpsc, Semaphore};

pub fn session(bearer: &str) -> SessionToken {
    SessionToken::new(bearer, format!("user-{bearer}"))
}

pub fn event_json(id: i64, symbol: &str, target: f64, above: bool) -> String {
    serde_json::json!({
        "stockAlertId": id,
        "stockSymbol": symbol,
        "targetPrice": target,
        "above": above,
    })
    .to_string()
}

pub fn fast_retry(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::exponential(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
    )
}

pub fn deps(
    session: Option<SessionToken>,
    api: Arc<FakeAlertsApi>,
    transport: Arc<FakeTransport>,
    policy: ReconnectPolicy,
) -> AlertDeps {
    AlertDeps {
        session: Arc::new(FixedSession(session)),
        gate: AlertGate::new(api),
        transport,
        policy,
        capacity: None,
    }
}

pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Session provider whose answer is held until `release` is called.
pub struct HeldSession {
    session: SessionToken,
    hold: Semaphore,
    calls: AtomicUsize,
}

impl HeldSession {
    pub fn new(session: SessionToken) -> Arc<Self> {
        Arc::new(Self {
            session,
            hold: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        self.hold.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for HeldSession {
    async fn current_session(&self) -> Option<SessionToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hold.acquire().await.ok()?.forget();
        Some(self.session.clone())
    }
}

/// `GET /alerts` stand-in. Each call pops the next scripted answer; the last
/// one repeats. `Ok(n)` returns n alerts, `Err(status)` fails.
pub struct FakeAlertsApi {
    answers: Mutex<VecDeque<Result<usize, u16>>>,
    calls: AtomicUsize,
    hold: Option<Semaphore>,
}

impl FakeAlertsApi {
    pub fn with_alerts(n: usize) -> Arc<Self> {
        Self::sequence(vec![Ok(n)])
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Self::sequence(vec![Err(status)])
    }

    pub fn sequence(answers: Vec<Result<usize, u16>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicUsize::new(0),
            hold: None,
        })
    }

    /// Every call blocks until `release` is called.
    pub fn held(n: usize) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(vec![Ok(n)].into()),
            calls: AtomicUsize::new(0),
            hold: Some(Semaphore::new(0)),
        })
    }

    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_answer(&self) -> Result<usize, u16> {
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            *answers.front().unwrap()
        }
    }
}

#[async_trait]
impl AlertsApi for FakeAlertsApi {
    async fn list_alerts(&self, _session: &SessionToken) -> Result<Vec<Alert>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.acquire().await.unwrap().forget();
        }

        match self.next_answer() {
            Ok(n) => Ok((0..n)
                .map(|i| Alert {
                    id: AlertId::Number(i as i64),
                    symbol: "AAPL".into(),
                    target_price: 100.0,
                    above: true,
                })
                .collect()),
            Err(status) => Err(BackendError::Status {
                status,
                body: "scripted failure".into(),
            }),
        }
    }
}

type Feed = mpsc::UnboundedSender<Result<String, StreamError>>;

/// In-memory push transport. Every accepted connect gets a feed the test
/// drives with `push`, `fail` and `end` (indexed in connect order).
#[derive(Default)]
pub struct FakeTransport {
    feeds: Mutex<Vec<Option<Feed>>>,
    connects: AtomicUsize,
    refuse: AtomicUsize,
    hang_up: AtomicBool,
    close_calls: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse the next `n` connects with HTTP 503.
    pub fn refusing(n: usize) -> Arc<Self> {
        let t = Self::default();
        t.refuse.store(n, Ordering::SeqCst);
        Arc::new(t)
    }

    /// Accept every connect, then end the stream before any frame.
    pub fn hanging_up() -> Arc<Self> {
        let t = Self::default();
        t.hang_up.store(true, Ordering::SeqCst);
        Arc::new(t)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn open_feeds(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    pub fn push(&self, conn: usize, raw: &str) {
        self.send(conn, Ok(raw.to_string()));
    }

    pub fn fail(&self, conn: usize) {
        self.send(conn, Err(StreamError::Transport("connection reset".into())));
    }

    pub fn end(&self, conn: usize) {
        self.feeds.lock().unwrap()[conn].take();
    }

    fn send(&self, conn: usize, msg: Result<String, StreamError>) {
        let feeds = self.feeds.lock().unwrap();
        let feed = feeds[conn].as_ref().expect("feed already ended");
        feed.send(msg).expect("connection dropped");
    }
}

#[async_trait]
impl AlertTransport for FakeTransport {
    async fn connect(&self, _session: &SessionToken) -> Result<Box<dyn AlertConnection>, StreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StreamError::Status(503));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let feed = (!self.hang_up.load(Ordering::SeqCst)).then_some(tx);
        self.feeds.lock().unwrap().push(feed);

        Ok(Box::new(FakeConnection {
            rx,
            closed: false,
            close_calls: Arc::clone(&self.close_calls),
        }))
    }
}

struct FakeConnection {
    rx: mpsc::UnboundedReceiver<Result<String, StreamError>>,
    closed: bool,
    close_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AlertConnection for FakeConnection {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    fn close(&mut self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        self.rx.close();
    }
}

mod common;

use std::{sync::Arc, time::Duration};

use common::{event_json, eventually, fast_retry, session, FakeAlertsApi, FakeTransport};
use marketbell::services::{
    alert_subscriber::StreamState,
    reconnect::ReconnectPolicy,
    session::{AuthEvents, AuthStateChange},
    subscription_manager::{AlertListener, ListenerEvent, SubscriptionManager},
};

fn manager(api: Arc<FakeAlertsApi>, transport: Arc<FakeTransport>, policy: ReconnectPolicy) -> SubscriptionManager {
    SubscriptionManager::new(api, transport, policy, Some(50))
}

async fn next(listener: &mut AlertListener) -> ListenerEvent {
    tokio::time::timeout(Duration::from_secs(2), listener.next())
        .await
        .expect("listener event in time")
}

async fn wait_open(listener: &AlertListener) {
    let mut rx = listener.watch_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        marketbell::services::alert_subscriber::wait_for_state(&mut rx, |s| *s == StreamState::Open),
    )
    .await
    .expect("link open in time");
}

#[tokio::test]
async fn listeners_of_one_session_share_a_connection() {
    let transport = FakeTransport::new();
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), ReconnectPolicy::none());

    let mut bell = m.subscribe(session("s1"));
    let mut toasts = m.subscribe(session("s1"));
    wait_open(&bell).await;

    assert_eq!(transport.connects(), 1);
    assert_eq!(m.link_count(), 1);
    assert_eq!(m.listener_count(&session("s1")), 2);

    transport.push(0, &event_json(4, "AAPL", 190.0, true));

    for listener in [&mut bell, &mut toasts] {
        match next(listener).await {
            ListenerEvent::Notification(entry) => assert_eq!(entry.alert_id, 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    let snapshot = m.snapshot(&session("s1")).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].symbol, "AAPL");
}

#[tokio::test]
async fn last_listener_leaving_closes_the_link() {
    let transport = FakeTransport::new();
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), ReconnectPolicy::none());

    let a = m.subscribe(session("s1"));
    let b = m.subscribe(session("s1"));
    wait_open(&a).await;

    drop(a);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(m.link_count(), 1);
    assert_eq!(transport.close_calls(), 0);

    drop(b);
    assert_eq!(m.link_count(), 0);
    eventually(|| transport.close_calls() == 1).await;
    assert!(m.snapshot(&session("s1")).await.is_empty());
}

#[tokio::test]
async fn sessions_get_separate_links() {
    let transport = FakeTransport::new();
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), ReconnectPolicy::none());

    let a = m.subscribe(session("s1"));
    let b = m.subscribe(session("s2"));
    wait_open(&a).await;
    wait_open(&b).await;

    assert_eq!(m.link_count(), 2);
    assert_eq!(transport.connects(), 2);
}

#[tokio::test]
async fn sign_out_tears_the_link_down() {
    let transport = FakeTransport::new();
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), ReconnectPolicy::none());
    let auth = AuthEvents::new();
    m.watch_auth(auth.on_auth_state_change());

    let mut listener = m.subscribe(session("s1"));
    wait_open(&listener).await;

    auth.publish(AuthStateChange::SignedOut("s1".into()));

    assert_eq!(next(&mut listener).await, ListenerEvent::Ended(StreamState::Closed));
    assert_eq!(m.link_count(), 0);
    eventually(|| transport.close_calls() == 1).await;
}

#[tokio::test]
async fn finished_link_is_replaced_on_next_subscribe() {
    let api = FakeAlertsApi::sequence(vec![Ok(0), Ok(1)]);
    let transport = FakeTransport::new();
    let m = manager(api.clone(), transport.clone(), ReconnectPolicy::none());

    let mut first = m.subscribe(session("s1"));
    assert_eq!(next(&mut first).await, ListenerEvent::Ended(StreamState::GatedClosed));
    assert_eq!(transport.connects(), 0);

    let second = m.subscribe(session("s1"));
    wait_open(&second).await;
    assert_eq!(api.calls(), 2);

    // the stale listener must not release the new link
    drop(first);
    assert_eq!(m.link_count(), 1);
    assert_eq!(m.listener_count(&session("s1")), 1);
    assert_eq!(m.state_of(&session("s1")), Some(StreamState::Open));
}

#[tokio::test]
async fn exhausted_reconnects_reach_listeners_as_disconnected() {
    let transport = FakeTransport::refusing(10);
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), fast_retry(1));

    let mut listener = m.subscribe(session("s1"));
    assert_eq!(next(&mut listener).await, ListenerEvent::Ended(StreamState::Disconnected));
    assert_eq!(transport.connects(), 2);
    assert_eq!(m.state_of(&session("s1")), Some(StreamState::Disconnected));
}

#[tokio::test]
async fn events_delivered_before_link_ends_are_not_lost() {
    let transport = FakeTransport::new();
    let m = manager(FakeAlertsApi::with_alerts(1), transport.clone(), ReconnectPolicy::none());

    let mut listener = m.subscribe(session("s1"));
    wait_open(&listener).await;

    transport.push(0, &event_json(1, "AAPL", 190.0, true));
    transport.fail(0);
    eventually(|| m.state_of(&session("s1")) == Some(StreamState::Closed)).await;

    assert!(matches!(next(&mut listener).await, ListenerEvent::Notification(e) if e.alert_id == 1));
    assert_eq!(next(&mut listener).await, ListenerEvent::Ended(StreamState::Closed));
}

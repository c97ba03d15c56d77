pub mod backend;
pub mod session;
pub mod reconnect;

pub mod alert_gate;
pub mod sse;
pub mod alert_stream;
pub mod notifications;
pub mod alert_subscriber;
pub mod subscription_manager;

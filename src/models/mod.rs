pub mod alert;
pub mod alert_event;
pub mod notification;
pub mod session;

pub use alert::{Alert, AlertCondition, AlertId};
pub use alert_event::AlertTriggerEvent;
pub use notification::NotificationEntry;
pub use session::SessionToken;

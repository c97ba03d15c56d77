use handlebars::Handlebars;
use serde_json::json;

use crate::{
    models::{NotificationEntry, SessionToken},
    services::alert_subscriber::StreamState,
};

fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}

fn entry_json(e: &NotificationEntry) -> serde_json::Value {
    json!({
        "alert_id": e.alert_id,
        "symbol": e.symbol,
        "target": fmt2(e.target_price),
        "direction": e.condition().as_str(),
        "headline": e.headline(),
        "received_at": e.received_at.format("%H:%M:%S").to_string(),
    })
}

pub fn render_full(
    hbs: &Handlebars<'static>,
    title: &str,
    body_html: String,
    session: Option<&SessionToken>,
) -> Result<String, String> {
    let ctx = json!({
        "title": title,
        "body": body_html,
        "is_logged_in": session.is_some(),
        "subject": session.map(|s| s.subject.as_str()),
    });

    hbs.render("layouts/base", &ctx).map_err(|e| e.to_string())
}

/// Nav-bar bell: badge count plus the newest-first dropdown.
pub fn render_bell(
    hbs: &Handlebars<'static>,
    entries: &[NotificationEntry],
    state: Option<StreamState>,
) -> Result<String, String> {
    let items: Vec<serde_json::Value> = entries.iter().map(entry_json).collect();

    let ctx = json!({
        "count": items.len(),
        "items": items,
        "disconnected": state == Some(StreamState::Disconnected),
    });

    hbs.render("partials/notification_bell", &ctx)
        .map_err(|e| e.to_string())
}

pub fn render_toasts(
    hbs: &Handlebars<'static>,
    entries: &[NotificationEntry],
) -> Result<String, String> {
    let items: Vec<serde_json::Value> = entries.iter().map(entry_json).collect();

    hbs.render("partials/toast_list", &json!({ "items": items }))
        .map_err(|e| e.to_string())
}

/// Single toast pushed over the browser event stream.
pub fn render_toast(hbs: &Handlebars<'static>, entry: &NotificationEntry) -> Result<String, String> {
    hbs.render("partials/toast", &entry_json(entry))
        .map_err(|e| e.to_string())
}

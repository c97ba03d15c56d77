//! Library entrypoint for MarketBell.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

use std::{sync::Arc, time::Duration};

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

use error::AppError;
use services::{
    alert_stream::SseTransport,
    backend::BackendClient,
    session::AuthEvents,
    subscription_manager::SubscriptionManager,
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub settings: config::Settings,
    pub alerts: SubscriptionManager,
    pub auth_events: AuthEvents,
}

impl AppState {
    /// Wires the backend client and SSE transport from settings.
    pub fn from_settings(settings: config::Settings) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);

        // no overall timeout: the alert stream is long-lived
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;

        let api = Arc::new(BackendClient::new(http.clone(), settings.alerts_url(), timeout));
        let transport = Arc::new(SseTransport::new(http, settings.alert_stream_url()));
        let alerts = SubscriptionManager::new(
            api,
            transport,
            settings.reconnect_policy(),
            settings.capacity(),
        );

        Self::with_manager(settings, alerts)
    }

    /// Must be called inside a Tokio runtime (spawns the auth listener).
    pub fn with_manager(
        settings: config::Settings,
        alerts: SubscriptionManager,
    ) -> Result<Self, AppError> {
        let auth_events = AuthEvents::new();
        alerts.watch_auth(auth_events.on_auth_state_change());

        Ok(Self {
            hbs: templates::build_handlebars()?,
            settings,
            alerts,
            auth_events,
        })
    }
}

//! Error types for the alert slice and app startup.

use thiserror::Error;

/// Failures talking to the backend REST API.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

/// Failures on the server-push alert stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("alert stream connect failed: {0}")]
    Connect(String),

    #[error("alert stream returned HTTP {0}")]
    Status(u16),

    #[error("alert stream transport error: {0}")]
    Transport(String),
}

/// Startup failures surfaced by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

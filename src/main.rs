use std::net::{IpAddr, SocketAddr};

use marketbell::{config, error::AppError, routes, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let host = settings
        .host
        .parse::<IpAddr>()
        .map_err(|e| AppError::Config(format!("HOST {:?}: {e}", settings.host)))?;
    let addr = SocketAddr::from((host, settings.port));

    tracing::info!(
        backend = %settings.backend_url,
        stream = %settings.alert_stream_url(),
        "alert backend configured"
    );

    let state = AppState::from_settings(settings)?;
    let app = routes::app(state);

    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

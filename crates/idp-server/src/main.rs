//! Identity provider server binary.

use tracing_subscriber::EnvFilter;

use idp_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        issuer = %config.issuer,
        bind = %config.bind_addr,
        algorithm = %config.default_algorithm,
        "starting identity provider"
    );

    let state = AppState::new(&config);
    let app = router::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

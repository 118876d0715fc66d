//! Liveness endpoint for the hosting platform's health polling.
//!
//! Independent of the bot: it answers as long as the process is up.

use std::net::SocketAddr;

use axum::{routing::get, Router};

pub async fn serve(port: u16) -> std::io::Result<()> {
    let app = Router::new()
        .route("/", get(alive))
        .route("/health", get(alive));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "liveness endpoint listening");

    axum::serve(listener, app).await
}

async fn alive() -> &'static str {
    "Referral bot is running"
}

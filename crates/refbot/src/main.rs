use std::{sync::Arc, time::Duration};

use refbot_core::{config::Config, store::Database};

mod health;

/// Another instance holds the getUpdates slot; reconnect quickly once it
/// lets go.
const CONFLICT_BACKOFF: Duration = Duration::from_secs(5);
/// Anything else gets a longer pause before retrying.
const TRANSIENT_BACKOFF: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), refbot_core::Error> {
    refbot_core::logging::init("refbot")?;

    // Only unrecoverable configuration problems may stop the process; both
    // loads happen before any network traffic.
    let cfg = Arc::new(Config::load()?);
    let db = Arc::new(Database::open(&cfg.db_path)?);
    tracing::info!(path = %cfg.db_path.display(), "database ready");

    let port = cfg.liveness_port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            tracing::error!(error = %e, "liveness endpoint failed");
        }
    });

    loop {
        match refbot_telegram::router::run_polling(cfg.clone(), db.clone()).await {
            Ok(()) => break,
            Err(e) if refbot_telegram::router::is_conflict(&e) => {
                tracing::warn!(
                    error = %e,
                    backoff_secs = CONFLICT_BACKOFF.as_secs(),
                    "another bot instance is polling; reconnecting"
                );
                tokio::time::sleep(CONFLICT_BACKOFF).await;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backoff_secs = TRANSIENT_BACKOFF.as_secs(),
                    "polling failed; retrying"
                );
                tokio::time::sleep(TRANSIENT_BACKOFF).await;
            }
        }
    }

    Ok(())
}

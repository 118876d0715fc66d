use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;

use refbot_core::{config::Config, ports::Notifier, security::Cooldown, store::Database};

use crate::handlers;
use crate::TelegramNotifier;

/// Shared state handed to every handler through dptree.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub db: Arc<Database>,
    pub notifier: Arc<dyn Notifier>,
    pub cooldown: Mutex<Cooldown>,
}

/// Connect and run long polling until the dispatcher stops.
///
/// Connection failures surface to the caller, which classifies them with
/// [`is_conflict`] and backs off before reconnecting.
pub async fn run_polling(cfg: Arc<Config>, db: Arc<Database>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let me = bot.get_me().await?;
    tracing::info!(bot = me.username(), "bot connected");

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let state = Arc::new(AppState {
        cooldown: Mutex::new(Cooldown::new(cfg.rate_limit)),
        cfg,
        db,
        notifier,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// True when the failure means another process is consuming getUpdates for
/// this token. The supervisor uses a shorter backoff for this case.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<teloxide::RequestError>(),
        Some(teloxide::RequestError::Api(
            teloxide::ApiError::TerminatedByOtherGetUpdates
        ))
    )
}

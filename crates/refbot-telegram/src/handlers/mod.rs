//! Telegram update handlers.
//!
//! Routing order: slash commands first ( `/start` plus the admin surface),
//! then menu buttons and claim-flow text. The admin capability check happens
//! once at entry; the per-user cooldown gates everything that can mutate the
//! claim flow, and dropped events get no reply at all.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use refbot_core::{
    domain::{ChatId, UserId},
    security::is_admin,
};

use crate::router::AppState;

mod commands;
mod text;
mod views;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);
    let admin = is_admin(&state.cfg, Some(user_id), chat_id);

    let Some(body) = msg.text() else {
        // Stickers, photos and the like have no place in this flow.
        return Ok(());
    };

    if body.trim_start().starts_with('/') {
        return commands::handle_command(bot, msg, state, admin).await;
    }

    // Ordinary chatter in the admin channel never enters the claim flow.
    if state.cfg.admin_channel_id == Some(chat_id.0) {
        return Ok(());
    }

    if !state.cooldown.lock().await.check(user_id) {
        return Ok(());
    }

    text::handle_text(bot, msg, state).await
}

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{KeyboardMarkup, Message, ParseMode, ReplyMarkup},
};

use refbot_core::{
    domain::{ChatId, UserId},
    flow::{self, FlowReply},
};

use crate::{keyboards, router::AppState};

use super::views;

/// Menu buttons and free-text claim-flow input.
pub async fn handle_text(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);
    let display_name = user.username.clone();
    let body = msg.text().unwrap_or("").trim();

    let cfg = &state.cfg;
    let db = state.db.as_ref();

    if body == keyboards::HELP {
        return send(&bot, &msg, &views::help(cfg), Some(keyboards::menu())).await;
    }

    let result = match body {
        b if b == keyboards::CLAIM => {
            flow::claim(db, user_id, display_name.as_deref(), &cfg.ref_code)
        }
        b if b == keyboards::STATUS => {
            flow::status(db, user_id, display_name.as_deref(), &cfg.ref_code)
        }
        other => flow::message(db, user_id, display_name.as_deref(), &cfg.ref_code, other),
    };

    match result {
        Ok(reply) => send_flow_reply(&bot, &msg, &state, reply).await,
        Err(e) => {
            // Never surface a raw error to the user; the next message will
            // simply re-derive the state.
            tracing::error!(user = user_id.0, error = %e, "claim flow failed");
            Ok(())
        }
    }
}

pub(super) async fn send_flow_reply(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    reply: FlowReply,
) -> ResponseResult<()> {
    let cfg = &state.cfg;

    match reply {
        FlowReply::Welcome { .. } => {
            send(bot, msg, &views::welcome(cfg), Some(keyboards::menu())).await
        }
        FlowReply::AlreadySubmitted { handle } => {
            send(
                bot,
                msg,
                &views::already_submitted(&handle),
                Some(keyboards::menu()),
            )
            .await
        }
        FlowReply::ClaimInstructions => {
            send(
                bot,
                msg,
                &views::claim_instructions(cfg),
                Some(keyboards::claim()),
            )
            .await
        }
        FlowReply::UsernamePrompt => {
            send(bot, msg, views::username_prompt(), Some(keyboards::menu())).await
        }
        FlowReply::UsernameInvalid => send(bot, msg, views::username_invalid(), None).await,
        FlowReply::SubmissionAccepted { submission } => {
            // Alert the admin side first so the review hint lands before the
            // user asks about it; both sends follow the persisted write.
            let alert = views::admin_alert(&submission);
            let target = ChatId(cfg.admin_channel_id.unwrap_or(cfg.admin_user_id));
            if let Err(e) = state.notifier.send_text(target, &alert).await {
                tracing::warn!(user = submission.user_id.0, error = %e, "admin alert failed");
            }

            send(
                bot,
                msg,
                &views::submission_confirmed(&submission.handle),
                Some(keyboards::menu()),
            )
            .await
        }
        FlowReply::StatusCard { record } => {
            send(bot, msg, &views::status_card(&record), Some(keyboards::menu())).await
        }
    }
}

pub(super) async fn send(
    bot: &Bot,
    msg: &Message,
    html: &str,
    kb: Option<KeyboardMarkup>,
) -> ResponseResult<()> {
    let mut req = bot
        .send_message(msg.chat.id, html)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true);
    if let Some(kb) = kb {
        req = req.reply_markup(ReplyMarkup::Keyboard(kb));
    }
    req.await?;
    Ok(())
}

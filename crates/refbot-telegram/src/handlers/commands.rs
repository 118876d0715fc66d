use std::sync::Arc;

use chrono::Utc;
use teloxide::{prelude::*, types::Message};

use refbot_core::{
    admin::{self, AdminCommand},
    domain::{ChatId, UserId},
    flow,
    formatting::escape_html,
};

use crate::router::AppState;

use super::{text, views};

/// Slash commands: `/start` for everyone, the admin surface for admins only.
///
/// Unknown commands and admin commands from non-admins get no reply at all;
/// the command surface is not advertised.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    admin: bool,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);
    let display_name = user.username.clone();
    let body = msg.text().unwrap_or("").to_string();

    if command_name(&body) == "start" {
        if state.cfg.admin_channel_id == Some(msg.chat.id.0) {
            return Ok(());
        }
        if !state.cooldown.lock().await.check(user_id) {
            return Ok(());
        }
        match flow::start(
            state.db.as_ref(),
            user_id,
            display_name.as_deref(),
            &state.cfg.ref_code,
        ) {
            Ok(reply) => return text::send_flow_reply(&bot, &msg, &state, reply).await,
            Err(e) => {
                tracing::error!(user = user_id.0, error = %e, "start failed");
                return Ok(());
            }
        }
    }

    let Some(parsed) = AdminCommand::parse(&body) else {
        return Ok(());
    };
    if !admin {
        return Ok(());
    }

    let command = match parsed {
        Ok(command) => command,
        Err(usage) => return text::send(&bot, &msg, &escape_html(&usage), None).await,
    };

    match command {
        AdminCommand::SetStatus { user_id: target, status } => {
            match admin::set_status(state.db.as_ref(), state.notifier.as_ref(), target, status)
                .await
            {
                Ok(()) => {
                    let note = format!("Updated status for {} → <b>{status}</b>", target.0);
                    text::send(&bot, &msg, &note, None).await?;
                }
                Err(e) => report_admin_error(&bot, &msg, e).await?,
            }
        }
        AdminCommand::Stats => match admin::stats(state.db.as_ref()) {
            Ok(report) => {
                text::send(&bot, &msg, &views::stats_report(&state.cfg, &report), None).await?;
            }
            Err(e) => report_admin_error(&bot, &msg, e).await?,
        },
        AdminCommand::Export => match admin::export_csv(state.db.as_ref()) {
            Ok(csv) => {
                let file_name = format!("users_export_{}.csv", Utc::now().timestamp());
                if let Err(e) = state
                    .notifier
                    .send_document(
                        ChatId(msg.chat.id.0),
                        &file_name,
                        csv.into_bytes(),
                        "Exported users CSV",
                    )
                    .await
                {
                    tracing::warn!(error = %e, "export delivery failed");
                }
            }
            Err(e) => report_admin_error(&bot, &msg, e).await?,
        },
        AdminCommand::Broadcast(body) => {
            match admin::broadcast(
                state.db.as_ref(),
                state.notifier.as_ref(),
                &escape_html(&body),
            )
            .await
            {
                Ok(report) => {
                    let note = format!(
                        "Broadcast delivered to <b>{}</b> users ({} failed).",
                        report.sent, report.failed
                    );
                    text::send(&bot, &msg, &note, None).await?;
                }
                Err(e) => report_admin_error(&bot, &msg, e).await?,
            }
        }
    }

    Ok(())
}

async fn report_admin_error(
    bot: &Bot,
    msg: &Message,
    err: refbot_core::Error,
) -> ResponseResult<()> {
    match admin::admin_error_reply(&err) {
        Some(reply) => text::send(bot, msg, &escape_html(&reply), None).await,
        None => {
            tracing::error!(error = %err, "admin command failed");
            Ok(())
        }
    }
}

fn command_name(body: &str) -> String {
    body.trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

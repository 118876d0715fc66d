use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded once at startup and passed explicitly.
///
/// Missing required values abort startup with a clear diagnostic rather than
/// failing later mid-conversation.
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram bot credential token.
    pub bot_token: String,
    /// The single admin identity.
    pub admin_user_id: i64,
    /// Optional admin channel; commands issued there are also privileged.
    pub admin_channel_id: Option<i64>,

    /// The single configured referral code.
    pub ref_code: String,
    /// Signup link handed out with the code.
    pub ref_link: String,
    pub brand_name: String,

    /// Port for the liveness HTTP endpoint.
    pub liveness_port: u16,
    /// Fixed per-user cooldown between accepted inbound events.
    pub rate_limit: Duration,
    pub db_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;

        let admin_user_id = match env_str("ADMIN_USER_ID") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("ADMIN_USER_ID is not a valid id: {raw:?}"))
            })?,
            None => {
                return Err(Error::Config(
                    "ADMIN_USER_ID environment variable is required".to_string(),
                ))
            }
        };

        let admin_channel_id = match env_str("ADMIN_CHANNEL_ID").and_then(non_empty) {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("ADMIN_CHANNEL_ID is not a valid chat id: {raw:?}"))
            })?),
            None => None,
        };

        let ref_code = env_str("REF_CODE").and_then(non_empty).ok_or_else(|| {
            Error::Config("REF_CODE environment variable is required".to_string())
        })?;
        let ref_link = env_str("REF_LINK").and_then(non_empty).ok_or_else(|| {
            Error::Config("REF_LINK environment variable is required".to_string())
        })?;

        let brand_name = env_str("BRAND_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "Referral Bonus Bot".to_string());

        let liveness_port = env_u16("PORT").unwrap_or(8080);
        let rate_limit = Duration::from_secs(env_u64("RATE_LIMIT_SECONDS").unwrap_or(3));
        let db_path = env_path("DB_PATH").unwrap_or_else(|| PathBuf::from("bot.db"));

        Ok(Self {
            bot_token,
            admin_user_id,
            admin_channel_id,
            ref_code,
            ref_link,
            brand_name,
            liveness_port,
            rate_limit,
            db_path,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

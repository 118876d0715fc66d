use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{
    config::Config,
    domain::{ChatId, UserId},
};

// ============== Authorization ==============

/// Capability check at the entry of the admin command surface.
///
/// A caller is privileged when their identity matches the configured admin or
/// the message originates in the configured admin channel. Callers that fail
/// this check get no response at all (silent denial), so the check lives in
/// one place rather than per command.
pub fn is_admin(cfg: &Config, user_id: Option<UserId>, chat_id: ChatId) -> bool {
    if let Some(channel) = cfg.admin_channel_id {
        if chat_id.0 == channel {
            return true;
        }
    }
    matches!(user_id, Some(id) if id.0 == cfg.admin_user_id)
}

// ============== Cooldown (fixed per-user rate limit) ==============

/// Fixed per-user cooldown between accepted inbound events.
///
/// Events inside the window are dropped silently (no reply, no state
/// transition). The read-then-stamp is done under one borrow, so two events
/// for the same user cannot both pass within the window as long as callers
/// hold a single lock around `check`.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last_accepted: HashMap<UserId, Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Returns true when the event is accepted (and stamps the user).
    pub fn check(&mut self, user_id: UserId) -> bool {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        if let Some(&last) = self.last_accepted.get(&user_id) {
            if now.duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(user_id, now);
        true
    }
}

//! Reply keyboards and their button labels.
//!
//! The labels double as routing keys in the text handler, so the constants
//! are the single source of truth for both.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

pub const CLAIM: &str = "💰 Claim Bonus";
pub const DONE: &str = "✅ Done";
pub const STATUS: &str = "📊 My Status";
pub const HELP: &str = "ℹ️ Help";

/// Main menu keyboard.
pub fn menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(CLAIM)],
        vec![KeyboardButton::new(STATUS), KeyboardButton::new(HELP)],
    ])
    .resize_keyboard(true)
}

/// Claim-step keyboard with the confirmation button.
pub fn claim() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(DONE)],
        vec![KeyboardButton::new(STATUS), KeyboardButton::new(HELP)],
    ])
    .resize_keyboard(true)
}

//! Core domain + application logic for the referral bonus bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! notifier port (trait) implemented in the adapter crate, so the claim flow,
//! admin operations and store can be tested without a live bot.

pub mod admin;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flow;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod security;
pub mod store;

pub use errors::{Error, Result};

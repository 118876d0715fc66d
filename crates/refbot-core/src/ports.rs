use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// Outbound notification port.
///
/// Telegram is the only implementation today; the trait keeps the claim flow
/// and admin operations testable without a live bot, and sends best-effort:
/// callers log and swallow `Error::Delivery` where the contract allows.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, html: &str) -> Result<()>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()>;
}

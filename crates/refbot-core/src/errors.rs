/// Core error type for the referral bot.
///
/// The adapter crate maps its transport-specific errors into this type so the
/// binary's supervisor loop can classify failures consistently (fatal config
/// vs admin-reported vs swallowed delivery vs retried transport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no user record for id {0}")]
    UserNotFound(i64),

    #[error("invalid status {0:?} (expected Pending, Verified or Rejected)")]
    InvalidStatus(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;

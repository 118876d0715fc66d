use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::errors::Error;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). For private chats this equals the user id;
/// for the admin channel it is the (negative) channel id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Verification outcome of a claim. Mutated only by admin actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Verified,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Verified => "Verified",
            Status::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "verified" => Ok(Status::Verified),
            "rejected" => Ok(Status::Rejected),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// One row of the `users` table: a single user's referral claim.
///
/// There is exactly one record per Telegram identity; records are created on
/// first contact and never deleted (export/audit trail).
#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Last-seen @username, best-effort (refreshed on contact).
    pub display_name: Option<String>,
    /// The configured referral code, assigned at record creation.
    pub referral_code: String,
    /// User pressed the confirmation token (step 1 done).
    pub confirmed: bool,
    /// Platform username from step 2; absent until submitted.
    pub submitted_handle: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The private chat for this user (Telegram private chat id == user id).
    pub fn chat_id(&self) -> ChatId {
        ChatId(self.user_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!("verified".parse::<Status>().unwrap(), Status::Verified);
        assert_eq!("PENDING".parse::<Status>().unwrap(), Status::Pending);
        assert_eq!(" Rejected ".parse::<Status>().unwrap(), Status::Rejected);
        assert!("approved".parse::<Status>().is_err());
    }

    #[test]
    fn status_roundtrips_through_display() {
        for s in [Status::Pending, Status::Verified, Status::Rejected] {
            assert_eq!(s.to_string().parse::<Status>().unwrap(), s);
        }
    }
}

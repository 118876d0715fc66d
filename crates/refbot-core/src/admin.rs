//! Admin operations: status transitions, stats, CSV export, broadcast.
//!
//! Callers are expected to have passed [`crate::security::is_admin`] already;
//! non-admin input never reaches this module.

use std::time::Duration;

use crate::{
    domain::{ChatId, Status, UserId},
    formatting::escape_html,
    ports::Notifier,
    store::{Database, StatusCount},
    Error, Result,
};

/// Pacing between broadcast sends so a large fan-out does not trip Telegram's
/// flood limits.
const BROADCAST_PACING: Duration = Duration::from_millis(30);

/// A parsed privileged command.
#[derive(Clone, Debug, PartialEq)]
pub enum AdminCommand {
    SetStatus { user_id: UserId, status: Status },
    Stats,
    Export,
    Broadcast(String),
}

impl AdminCommand {
    /// Parse a message body into an admin command.
    ///
    /// Returns `None` when the text is not one of the admin command names;
    /// `Some(Err(usage))` when the name matched but the arguments did not.
    pub fn parse(text: &str) -> Option<std::result::Result<Self, String>> {
        let (cmd, rest) = split_command(text);
        match cmd.as_str() {
            "setstatus" => Some(parse_setstatus(&rest)),
            "stats" => Some(Ok(AdminCommand::Stats)),
            "export" => Some(Ok(AdminCommand::Export)),
            "broadcast" => {
                if rest.is_empty() {
                    return Some(Err("Usage: /broadcast <text>".to_string()));
                }
                Some(Ok(AdminCommand::Broadcast(rest)))
            }
            _ => None,
        }
    }
}

/// Split `/cmd@botname arg1 ...` into a lowercase command name and the rest.
fn split_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn parse_setstatus(rest: &str) -> std::result::Result<AdminCommand, String> {
    const USAGE: &str = "Usage: /setstatus <telegram_id> <Pending|Verified|Rejected>";

    let mut parts = rest.split_whitespace();
    let (Some(id_raw), Some(status_raw), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(USAGE.to_string());
    };

    let Ok(id) = id_raw.parse::<i64>() else {
        return Err("Invalid telegram_id.".to_string());
    };

    let status = status_raw
        .parse::<Status>()
        .map_err(|_| "Status must be Pending, Verified, or Rejected.".to_string())?;

    Ok(AdminCommand::SetStatus {
        user_id: UserId(id),
        status,
    })
}

/// Update a record's status and notify the user, best-effort.
///
/// Fails with `UserNotFound` when no record matches; the notification is sent
/// only after the transition is persisted and a failed send is logged and
/// swallowed.
pub async fn set_status(
    db: &Database,
    notifier: &dyn Notifier,
    user_id: UserId,
    status: Status,
) -> Result<()> {
    db.set_status(user_id, status)?;

    let note = format!(
        "🔔 Your verification status is now: <b>{}</b>",
        escape_html(status.as_str())
    );
    if let Err(e) = notifier.send_text(ChatId(user_id.0), &note).await {
        tracing::warn!(user = user_id.0, error = %e, "status notification failed");
    }
    Ok(())
}

/// Read-only aggregation for `/stats`.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsReport {
    pub total: i64,
    pub rows: Vec<StatusCount>,
}

pub fn stats(db: &Database) -> Result<StatsReport> {
    Ok(StatsReport {
        total: db.count_users()?,
        rows: db.status_counts()?,
    })
}

const EXPORT_HEADER: &str =
    "telegram_id,display_name,referral_code,submitted_handle,status,created_at,updated_at";

/// Serialize all records to CSV: header row, then one row per record in a
/// fixed column order. No mutation.
pub fn export_csv(db: &Database) -> Result<String> {
    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');

    for rec in db.list_all()? {
        let row = [
            rec.user_id.0.to_string(),
            rec.display_name.clone().unwrap_or_default(),
            rec.referral_code.clone(),
            rec.submitted_handle.clone().unwrap_or_default(),
            rec.status.to_string(),
            rec.created_at.to_rfc3339(),
            rec.updated_at.to_rfc3339(),
        ];
        let row: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    Ok(out)
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        return format!("\"{}\"", raw.replace('"', "\"\""));
    }
    raw.to_string()
}

/// Outcome of a broadcast fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send `html` to every known user.
///
/// Per-recipient failures (blocked bot, deactivated account) are counted and
/// never abort the remaining sends.
pub async fn broadcast(db: &Database, notifier: &dyn Notifier, html: &str) -> Result<BroadcastReport> {
    let records = db.list_all()?;

    let mut report = BroadcastReport::default();
    for rec in records {
        match notifier.send_text(rec.chat_id(), html).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                tracing::debug!(user = rec.user_id.0, error = %e, "broadcast delivery failed");
            }
        }
        tokio::time::sleep(BROADCAST_PACING).await;
    }
    Ok(report)
}

/// Map an execution failure to the admin-facing reply, if one applies.
///
/// `UserNotFound` and `InvalidStatus` are reported to the admin; anything
/// else is logged by the caller.
pub fn admin_error_reply(err: &Error) -> Option<String> {
    match err {
        Error::UserNotFound(id) => Some(format!("User {id} not found in database.")),
        Error::InvalidStatus(_) => {
            Some("Status must be Pending, Verified, or Rejected.".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flow, ports::Notifier};
    use async_trait::async_trait;
    use std::{
        collections::HashSet,
        sync::Mutex,
    };

    #[derive(Default)]
    struct MockNotifier {
        fail_for: HashSet<i64>,
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl MockNotifier {
        fn failing_for(ids: &[i64]) -> Self {
            Self {
                fail_for: ids.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn sent_to(&self) -> Vec<i64> {
            self.sent.lock().unwrap().iter().map(|(id, _)| *id).collect()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send_text(&self, chat_id: ChatId, html: &str) -> Result<()> {
            if self.fail_for.contains(&chat_id.0) {
                return Err(Error::Delivery(format!("blocked by {}", chat_id.0)));
            }
            self.sent.lock().unwrap().push((chat_id.0, html.to_string()));
            Ok(())
        }

        async fn send_document(
            &self,
            chat_id: ChatId,
            _file_name: &str,
            _bytes: Vec<u8>,
            _caption: &str,
        ) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id.0, "<document>".to_string()));
            Ok(())
        }
    }

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn parses_valid_setstatus() {
        assert_eq!(
            AdminCommand::parse("/setstatus 123 Verified"),
            Some(Ok(AdminCommand::SetStatus {
                user_id: UserId(123),
                status: Status::Verified,
            }))
        );
        // Bot-mention suffix and lowercase status are fine.
        assert_eq!(
            AdminCommand::parse("/setstatus@refbot 123 rejected"),
            Some(Ok(AdminCommand::SetStatus {
                user_id: UserId(123),
                status: Status::Rejected,
            }))
        );
    }

    #[test]
    fn rejects_malformed_setstatus() {
        assert!(matches!(
            AdminCommand::parse("/setstatus 123"),
            Some(Err(usage)) if usage.starts_with("Usage:")
        ));
        assert!(matches!(
            AdminCommand::parse("/setstatus abc Verified"),
            Some(Err(msg)) if msg.contains("telegram_id")
        ));
        assert!(matches!(
            AdminCommand::parse("/setstatus 123 Approved"),
            Some(Err(msg)) if msg.contains("Pending, Verified, or Rejected")
        ));
    }

    #[test]
    fn parses_broadcast_and_ignores_unknown() {
        assert_eq!(
            AdminCommand::parse("/broadcast hello  world"),
            Some(Ok(AdminCommand::Broadcast("hello  world".to_string())))
        );
        assert!(matches!(AdminCommand::parse("/broadcast"), Some(Err(_))));
        assert_eq!(AdminCommand::parse("/stats"), Some(Ok(AdminCommand::Stats)));
        assert_eq!(AdminCommand::parse("/start"), None);
        assert_eq!(AdminCommand::parse("/unknown"), None);
    }

    #[tokio::test]
    async fn set_status_updates_and_notifies() {
        let db = db();
        db.get_or_create(UserId(5), Some("alice"), "PROMO42").unwrap();

        let notifier = MockNotifier::default();
        set_status(&db, &notifier, UserId(5), Status::Verified)
            .await
            .unwrap();

        assert_eq!(
            db.find(UserId(5)).unwrap().unwrap().status,
            Status::Verified
        );
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 5);
        assert!(sent[0].1.contains("Verified"));
    }

    #[tokio::test]
    async fn set_status_unknown_user_sends_nothing() {
        let db = db();
        let notifier = MockNotifier::default();

        let err = set_status(&db, &notifier, UserId(404), Status::Verified)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(404)));
        assert!(notifier.sent_to().is_empty());

        assert_eq!(
            admin_error_reply(&err).unwrap(),
            "User 404 not found in database."
        );
    }

    #[tokio::test]
    async fn set_status_survives_delivery_failure() {
        let db = db();
        db.get_or_create(UserId(5), None, "PROMO42").unwrap();

        let notifier = MockNotifier::failing_for(&[5]);
        set_status(&db, &notifier, UserId(5), Status::Rejected)
            .await
            .unwrap();

        // The transition persisted even though the notification bounced.
        assert_eq!(
            db.find(UserId(5)).unwrap().unwrap().status,
            Status::Rejected
        );
    }

    #[tokio::test]
    async fn broadcast_counts_partial_failures() {
        let db = db();
        for id in 1..=5 {
            db.get_or_create(UserId(id), None, "PROMO42").unwrap();
        }

        let notifier = MockNotifier::failing_for(&[2, 4]);
        let report = broadcast(&db, &notifier, "hello everyone").await.unwrap();

        assert_eq!(report, BroadcastReport { sent: 3, failed: 2 });
        assert_eq!(notifier.sent_to(), vec![1, 3, 5]);
    }

    #[test]
    fn export_has_header_and_escapes_fields() {
        let db = db();
        db.get_or_create(UserId(1), Some("plain"), "PROMO42").unwrap();
        db.get_or_create(UserId(2), Some("comma, \"quoted\""), "PROMO42")
            .unwrap();
        db.save_handle(UserId(1), "alice123").unwrap();

        let csv = export_csv(&db).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(EXPORT_HEADER));

        let first = lines.next().unwrap();
        assert!(first.starts_with("1,plain,PROMO42,alice123,Pending,"));

        let second = lines.next().unwrap();
        assert!(second.contains("\"comma, \"\"quoted\"\"\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn stats_reflect_store_counts() {
        let db = db();
        db.get_or_create(UserId(1), None, "PROMO42").unwrap();
        db.get_or_create(UserId(2), None, "PROMO42").unwrap();
        db.set_status(UserId(2), Status::Verified).unwrap();

        let report = stats(&db).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.rows.len(), 2);
    }

    /// The scenario from end to end: start → confirm → submit → verify.
    #[tokio::test]
    async fn claim_and_verify_end_to_end() {
        let db = db();
        let notifier = MockNotifier::default();
        let user = UserId(77);

        let reply = flow::start(&db, user, Some("alice"), "PROMO42").unwrap();
        assert!(matches!(reply, flow::FlowReply::Welcome { ref record }
            if record.status == Status::Pending && record.referral_code == "PROMO42"));

        assert_eq!(
            flow::message(&db, user, Some("alice"), "PROMO42", "done").unwrap(),
            flow::FlowReply::UsernamePrompt
        );

        let reply = flow::message(&db, user, Some("alice"), "PROMO42", "alice123").unwrap();
        let flow::FlowReply::SubmissionAccepted { submission } = reply else {
            panic!("expected submission, got {reply:?}");
        };
        assert_eq!(submission.handle, "alice123");

        // Admin verifies; the user is notified and stats count one Verified.
        set_status(&db, &notifier, user, Status::Verified)
            .await
            .unwrap();
        assert_eq!(notifier.sent_to(), vec![77]);

        let report = stats(&db).unwrap();
        assert!(report.rows.iter().any(|c| {
            c.referral_code == "PROMO42" && c.status == Status::Verified && c.count == 1
        }));
    }
}

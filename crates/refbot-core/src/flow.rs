//! The two-step claim flow.
//!
//! State is derived from the persisted record each time rather than held as
//! in-memory session state, so the machine survives process restarts (managed
//! redeploys) with no drift between stored state and stored data.

use crate::{
    domain::{Status, UserId, UserRecord},
    store::Database,
    Result,
};

/// Current position of a user in the claim flow, reconstructed from the
/// record's fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimState {
    /// Waiting for the user to confirm requirement completion.
    AwaitingCompletion,
    /// Confirmation received; the next free-text message is the username.
    AwaitingUsername,
    /// Handle on file; terminal for this cycle.
    Submitted,
}

pub fn claim_state(record: &UserRecord) -> ClaimState {
    if record.submitted_handle.is_some() {
        // A rejected user may resubmit; their next message overwrites the
        // handle. Anyone else with a handle on file is done.
        if record.status == Status::Rejected {
            return ClaimState::AwaitingUsername;
        }
        return ClaimState::Submitted;
    }
    if record.confirmed {
        return ClaimState::AwaitingUsername;
    }
    ClaimState::AwaitingCompletion
}

/// Semantic outcome of a flow step; the adapter renders these into chat
/// messages.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowReply {
    /// First contact / re-entry: show referral code and signup link.
    Welcome { record: UserRecord },
    /// Re-entry while a submission is on file; nothing changed.
    AlreadySubmitted { handle: String },
    /// Requirement instructions + confirmation keyboard.
    ClaimInstructions,
    /// Confirmation accepted; ask for the platform username.
    UsernamePrompt,
    /// Submitted text was not a usable username; repeat the prompt.
    UsernameInvalid,
    /// Handle stored; the adapter should alert the admin channel.
    SubmissionAccepted { submission: Submission },
    /// Read-only status card.
    StatusCard { record: UserRecord },
}

/// Data the admin alert needs after a completed submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub handle: String,
}

/// The confirmation token, matched case-insensitively with button decoration
/// (emoji, whitespace) stripped.
pub fn is_confirmation(text: &str) -> bool {
    let token: String = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    token == "done"
}

/// `/start`: ensure the record exists and greet. Idempotent: repeated starts
/// never duplicate a submission or reset anything.
pub fn start(
    db: &Database,
    user_id: UserId,
    display_name: Option<&str>,
    referral_code: &str,
) -> Result<FlowReply> {
    let record = db.get_or_create(user_id, display_name, referral_code)?;
    if let (ClaimState::Submitted, Some(handle)) =
        (claim_state(&record), record.submitted_handle.clone())
    {
        return Ok(FlowReply::AlreadySubmitted { handle });
    }
    Ok(FlowReply::Welcome { record })
}

/// The "Claim Bonus" menu button: re-send the instructions.
pub fn claim(
    db: &Database,
    user_id: UserId,
    display_name: Option<&str>,
    referral_code: &str,
) -> Result<FlowReply> {
    let record = db.get_or_create(user_id, display_name, referral_code)?;
    if let (ClaimState::Submitted, Some(handle)) =
        (claim_state(&record), record.submitted_handle.clone())
    {
        return Ok(FlowReply::AlreadySubmitted { handle });
    }
    Ok(FlowReply::ClaimInstructions)
}

/// The "My Status" menu button.
pub fn status(
    db: &Database,
    user_id: UserId,
    display_name: Option<&str>,
    referral_code: &str,
) -> Result<FlowReply> {
    let record = db.get_or_create(user_id, display_name, referral_code)?;
    Ok(FlowReply::StatusCard { record })
}

/// Free-text message: advance the flow from whatever state the record is in.
pub fn message(
    db: &Database,
    user_id: UserId,
    display_name: Option<&str>,
    referral_code: &str,
    text: &str,
) -> Result<FlowReply> {
    let record = db.get_or_create(user_id, display_name, referral_code)?;

    match claim_state(&record) {
        ClaimState::Submitted => {
            // Terminal for this cycle; repeated input changes nothing.
            let handle = record.submitted_handle.clone().unwrap_or_default();
            Ok(FlowReply::AlreadySubmitted { handle })
        }
        ClaimState::AwaitingCompletion => {
            if is_confirmation(text) {
                db.mark_confirmed(user_id)?;
                return Ok(FlowReply::UsernamePrompt);
            }
            // Anything else just repeats the prompt.
            Ok(FlowReply::ClaimInstructions)
        }
        ClaimState::AwaitingUsername => {
            if is_confirmation(text) {
                // Pressing Done again must not become the username.
                return Ok(FlowReply::UsernamePrompt);
            }
            let handle = text.trim();
            if handle.len() < 2 {
                return Ok(FlowReply::UsernameInvalid);
            }
            db.save_handle(user_id, handle)?;
            Ok(FlowReply::SubmissionAccepted {
                submission: Submission {
                    user_id,
                    display_name: record.display_name.clone(),
                    handle: handle.to_string(),
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;

    const CODE: &str = "PROMO42";

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn confirmation_token_matching() {
        assert!(is_confirmation("done"));
        assert!(is_confirmation("DONE"));
        assert!(is_confirmation("✅ Done"));
        assert!(is_confirmation("  done!  "));
        assert!(!is_confirmation("i am done now"));
        assert!(!is_confirmation("alice123"));
        assert!(!is_confirmation(""));
    }

    #[test]
    fn full_claim_cycle() {
        let db = db();
        let user = UserId(1);

        // Start: record created, Pending, configured code.
        let reply = start(&db, user, Some("alice"), CODE).unwrap();
        let FlowReply::Welcome { record } = reply else {
            panic!("expected welcome, got {reply:?}");
        };
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.referral_code, CODE);
        assert_eq!(claim_state(&record), ClaimState::AwaitingCompletion);

        // Unrelated chatter repeats the instructions.
        assert_eq!(
            message(&db, user, Some("alice"), CODE, "hello?").unwrap(),
            FlowReply::ClaimInstructions
        );

        // Confirmation moves to the username step.
        assert_eq!(
            message(&db, user, Some("alice"), CODE, "✅ Done").unwrap(),
            FlowReply::UsernamePrompt
        );
        let record = db.find(user).unwrap().unwrap();
        assert_eq!(claim_state(&record), ClaimState::AwaitingUsername);

        // Username is stored and the submission surfaced for the admin alert.
        let reply = message(&db, user, Some("alice"), CODE, " alice123 ").unwrap();
        let FlowReply::SubmissionAccepted { submission } = reply else {
            panic!("expected submission, got {reply:?}");
        };
        assert_eq!(submission.handle, "alice123");

        let record = db.find(user).unwrap().unwrap();
        assert_eq!(record.submitted_handle.as_deref(), Some("alice123"));
        assert_eq!(claim_state(&record), ClaimState::Submitted);
    }

    #[test]
    fn restart_after_submission_changes_nothing() {
        let db = db();
        let user = UserId(1);
        start(&db, user, None, CODE).unwrap();
        message(&db, user, None, CODE, "done").unwrap();
        message(&db, user, None, CODE, "alice123").unwrap();

        assert_eq!(
            start(&db, user, None, CODE).unwrap(),
            FlowReply::AlreadySubmitted {
                handle: "alice123".to_string()
            }
        );
        // Even a plausible new username is refused while submitted.
        assert_eq!(
            message(&db, user, None, CODE, "bob456").unwrap(),
            FlowReply::AlreadySubmitted {
                handle: "alice123".to_string()
            }
        );

        let record = db.find(user).unwrap().unwrap();
        assert_eq!(record.submitted_handle.as_deref(), Some("alice123"));
        assert_eq!(record.status, Status::Pending);
    }

    #[test]
    fn empty_or_too_short_username_repeats_prompt() {
        let db = db();
        let user = UserId(1);
        start(&db, user, None, CODE).unwrap();
        message(&db, user, None, CODE, "done").unwrap();

        assert_eq!(
            message(&db, user, None, CODE, "   ").unwrap(),
            FlowReply::UsernameInvalid
        );
        assert_eq!(
            message(&db, user, None, CODE, "x").unwrap(),
            FlowReply::UsernameInvalid
        );
        assert!(db.find(user).unwrap().unwrap().submitted_handle.is_none());
    }

    #[test]
    fn repeated_done_is_not_taken_as_username() {
        let db = db();
        let user = UserId(1);
        start(&db, user, None, CODE).unwrap();
        message(&db, user, None, CODE, "done").unwrap();

        assert_eq!(
            message(&db, user, None, CODE, "✅ Done").unwrap(),
            FlowReply::UsernamePrompt
        );
        assert!(db.find(user).unwrap().unwrap().submitted_handle.is_none());
    }

    #[test]
    fn rejected_user_may_resubmit() {
        let db = db();
        let user = UserId(1);
        start(&db, user, None, CODE).unwrap();
        message(&db, user, None, CODE, "done").unwrap();
        message(&db, user, None, CODE, "wrong_handle").unwrap();
        db.set_status(user, Status::Rejected).unwrap();

        let record = db.find(user).unwrap().unwrap();
        assert_eq!(claim_state(&record), ClaimState::AwaitingUsername);

        let reply = message(&db, user, None, CODE, "corrected_handle").unwrap();
        assert!(matches!(reply, FlowReply::SubmissionAccepted { .. }));

        let record = db.find(user).unwrap().unwrap();
        assert_eq!(record.submitted_handle.as_deref(), Some("corrected_handle"));
        // Only the admin moves status; resubmission does not reset it.
        assert_eq!(record.status, Status::Rejected);
    }
}

//! User- and admin-facing message bodies (Telegram HTML).

use refbot_core::{
    admin::StatsReport,
    config::Config,
    domain::{Status, UserRecord},
    flow::Submission,
    formatting::{divider, escape_html, header, line},
};

pub fn welcome(cfg: &Config) -> String {
    let mut out = format!("🏁 <b>Welcome to {}!</b>\n", escape_html(&cfg.brand_name));
    out.push_str(divider());
    out.push_str("💵 <b>Get Your Bonus</b>\n\n");
    out.push_str("<b>How it works:</b>\n");
    out.push_str("  1. Sign up with our code\n");
    out.push_str("  2. Complete the requirements\n");
    out.push_str("  3. Submit your username\n");
    out.push_str("  4. Get approved!\n");
    out.push_str(line());
    out.push_str(&format!(
        "📋 <b>Code:</b> <code>{}</code>\n",
        escape_html(&cfg.ref_code)
    ));
    out.push_str(&format!("🔗 <b>Link:</b> {}\n", escape_html(&cfg.ref_link)));
    out.push_str(divider());
    out.push_str("👇 Tap <b>Claim Bonus</b> to start");
    out
}

pub fn claim_instructions(cfg: &Config) -> String {
    let mut out = String::from("💰 <b>Claim Your Bonus</b>\n");
    out.push_str(divider());
    out.push_str("<b>Step 1:</b> Complete Requirements\n\n");
    out.push_str("  ▸ Sign up using the link below\n");
    out.push_str(&format!(
        "  ▸ Use code: <code>{}</code>\n",
        escape_html(&cfg.ref_code)
    ));
    out.push_str(line());
    out.push_str(&format!("🔗 {}\n", escape_html(&cfg.ref_link)));
    out.push_str(divider());
    out.push_str("<b>Step 2:</b> Tap <b>Done</b> when ready");
    out
}

pub fn username_prompt() -> &'static str {
    "✅ <b>Great!</b>\n\nNow send your <b>platform username</b>\nso we can verify your account."
}

pub fn username_invalid() -> &'static str {
    "⚠️ Please enter a valid username."
}

pub fn submission_confirmed(handle: &str) -> String {
    let mut out = String::from("🎉 <b>Submitted!</b>\n");
    out.push_str(divider());
    out.push_str(&format!(
        "Username: <code>{}</code>\n\n",
        escape_html(handle)
    ));
    out.push_str("We'll verify within 24-48 hours.\n");
    out.push_str("You'll be notified when approved.");
    out
}

pub fn already_submitted(handle: &str) -> String {
    format!(
        "📌 Your submission <code>{}</code> is already on file.\nWe'll notify you once it's reviewed.",
        escape_html(handle)
    )
}

pub fn status_card(record: &UserRecord) -> String {
    let status_icon = match record.status {
        Status::Pending => "⏳",
        Status::Verified => "✅",
        Status::Rejected => "❌",
    };

    let mut out = String::from("📊 <b>Your Status</b>\n");
    out.push_str(divider());
    out.push_str(&format!("<b>ID:</b> <code>{}</code>\n", record.user_id.0));
    out.push_str(&format!(
        "<b>Username:</b> {}\n",
        record
            .submitted_handle
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "—".to_string())
    ));
    out.push_str(&format!(
        "<b>Status:</b> {status_icon} {}\n",
        record.status
    ));
    out.push_str(divider());
    out.push_str(match record.status {
        Status::Pending => "Your submission is being reviewed.",
        Status::Verified => "Your bonus has been approved! 🎉",
        Status::Rejected => "Contact support for details.",
    });
    out
}

pub fn help(cfg: &Config) -> String {
    let mut out = String::from("ℹ️ <b>Help</b>\n");
    out.push_str(divider());
    out.push_str("<b>How to claim your bonus:</b>\n\n");
    out.push_str(&format!("  1. Sign up → {}\n", escape_html(&cfg.ref_link)));
    out.push_str(&format!(
        "  2. Use code: <code>{}</code>\n",
        escape_html(&cfg.ref_code)
    ));
    out.push_str("  3. Complete the requirements\n");
    out.push_str("  4. Submit username\n");
    out.push_str("  5. Wait 24-48 hrs\n");
    out.push_str(divider());
    out.push_str("Questions? Contact support.");
    out
}

/// Submission alert for the admin channel, with a ready-made review command.
pub fn admin_alert(submission: &Submission) -> String {
    let who = submission
        .display_name
        .as_deref()
        .map(|n| format!("@{}", escape_html(n)))
        .unwrap_or_else(|| "—".to_string());

    let mut out = String::from("🆕 <b>New Submission</b>\n");
    out.push_str(&format!("┌ User: {who}\n"));
    out.push_str(&format!(
        "├ Platform: <code>{}</code>\n",
        escape_html(&submission.handle)
    ));
    out.push_str(&format!("└ ID: <code>{}</code>\n\n", submission.user_id.0));
    out.push_str(&format!(
        "<code>/setstatus {} Verified</code>",
        submission.user_id.0
    ));
    out
}

pub fn stats_report(cfg: &Config, report: &StatsReport) -> String {
    let mut out = header("Bot Statistics");
    out.push('\n');
    out.push_str(&format!("<b>Total Users:</b> {}\n\n", report.total));

    out.push_str("<b>By Status:</b>\n");
    for row in &report.rows {
        let code = if row.referral_code.is_empty() {
            escape_html(&cfg.ref_code)
        } else {
            escape_html(&row.referral_code)
        };
        out.push_str(&format!(
            "• <code>{code}</code> {}: {}\n",
            row.status, row.count
        ));
    }
    out
}

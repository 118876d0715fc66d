//! Telegram HTML helpers and the message furniture shared by the handlers.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Heavy visual divider between message sections.
pub fn divider() -> &'static str {
    "\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n"
}

/// Thin line between steps within a section.
pub fn line() -> &'static str {
    "\n┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈\n"
}

/// Boxed header used by the stats report.
pub fn header(text: &str) -> String {
    let bar = "━".repeat(30);
    format!("\n{bar}\n   {text}\n{bar}\n")
}

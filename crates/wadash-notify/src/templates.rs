//! Subjects and HTML bodies for every notification the dashboard sends.

use std::fmt::Write as _;

use wadash_core::PostStatus;

const BRAND_GREEN: &str = "#25D366";
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

/// The post fields notifications quote.
#[derive(Debug, Clone, Default)]
pub struct PostNotice {
    pub post_id: i64,
    pub title: String,
    pub assembly_name: String,
    pub scheduled_date: String,
    pub scheduled_time: String,
    pub group_count: usize,
    pub message: String,
    /// Attachment slots present, e.g. `["Image", "Audio"]`.
    pub media: Vec<&'static str>,
    pub username: String,
    pub user_email: String,
    pub completed_at: Option<String>,
    pub admin_notes: Option<String>,
}

impl PostNotice {
    fn media_files(&self) -> String {
        if self.media.is_empty() {
            "None".to_string()
        } else {
            self.media.join(", ")
        }
    }

    fn preview(&self) -> String {
        if self.message.chars().count() > PREVIEW_CHARS {
            let head: String = self.message.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            self.message.clone()
        }
    }
}

/// Who removed a post, which decides who hears about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedBy {
    Admin,
    Owner,
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Success,
    Info,
    Warning,
    Error,
}

impl Tone {
    fn color(self) -> &'static str {
        match self {
            Tone::Success => "#28a745",
            Tone::Info => "#17a2b8",
            Tone::Warning => "#ffc107",
            Tone::Error => "#dc3545",
        }
    }
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn details(rows: &[(&str, String)]) -> String {
    let mut out = String::from(
        "<div style=\"background: #f8f9fa; padding: 15px; border-radius: 5px; margin: 15px 0;\">",
    );
    for (label, value) in rows {
        let _ = write!(out, "<p><strong>{label}:</strong> {}</p>", escape(value));
    }
    out.push_str("</div>");
    out
}

fn wrap(tone: Tone, subject: String, heading: &str, body: &str) -> Email {
    let color = tone.color();
    let html = format!(
        "<html><body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\
         <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\
         <div style=\"border-top: 4px solid {color}; background: white; padding: 20px;\">\
         <h3 style=\"color: {color}; margin-top: 0;\">{heading}</h3>{body}</div>\
         <p style=\"text-align: center; color: #666; font-size: 12px;\">\
         This email was sent from \
         <strong style=\"color: {BRAND_GREEN};\">WhatsApp Analytics Dashboard</strong></p>\
         </div></body></html>"
    );
    Email { subject, html }
}

#[must_use]
pub fn welcome(username: &str) -> Email {
    let body = format!(
        "<p>Hi {}!</p><p>Your WhatsApp Analytics Dashboard account is ready. You can now \
         explore message analytics, review group activity and schedule posts.</p>",
        escape(username)
    );
    wrap(
        Tone::Success,
        "Welcome to WhatsApp Analytics Dashboard".to_string(),
        "Welcome to WhatsApp Analytics",
        &body,
    )
}

#[must_use]
pub fn test_message(from: &str, to: &str, sent_at: &str) -> Email {
    let body = format!(
        "<p>This is a test email from the WhatsApp Analytics Dashboard.</p>{}\
         <p>If you are reading this, SMTP delivery is configured correctly.</p>",
        details(&[
            ("From", from.to_string()),
            ("To", to.to_string()),
            ("Time", sent_at.to_string()),
        ])
    );
    wrap(
        Tone::Info,
        "Test Email from WhatsApp Analytics Dashboard".to_string(),
        "Test Email",
        &body,
    )
}

/// Confirmation to the user who scheduled a post.
#[must_use]
pub fn post_scheduled(post: &PostNotice) -> Email {
    let body = format!(
        "<p>Hi {}, your post has been scheduled successfully.</p>{}",
        escape(&post.username),
        details(&[
            ("Post Title", post.title.clone()),
            (
                "Scheduled Date & Time",
                format!("{} at {}", post.scheduled_date, post.scheduled_time),
            ),
            ("Assembly", post.assembly_name.clone()),
            ("Target Groups", format!("{} groups", post.group_count)),
            ("Message", post.preview()),
            ("Media Files", post.media_files()),
        ])
    );
    wrap(
        Tone::Success,
        "Post Scheduled Successfully - WhatsApp Analytics".to_string(),
        "Post Scheduled Successfully!",
        &body,
    )
}

/// Heads-up to the admin address that someone scheduled a post.
#[must_use]
pub fn admin_post_scheduled(post: &PostNotice) -> Email {
    let body = format!(
        "<p>A new post has been scheduled:</p>{}",
        details(&[
            ("User", format!("{} ({})", post.username, post.user_email)),
            ("Post Title", post.title.clone()),
            (
                "Scheduled Date & Time",
                format!("{} at {}", post.scheduled_date, post.scheduled_time),
            ),
            ("Assembly", post.assembly_name.clone()),
            ("Target Groups", format!("{} groups", post.group_count)),
            ("Post ID", post.post_id.to_string()),
            ("Media Files", post.media_files()),
        ])
    );
    wrap(
        Tone::Info,
        "New Post Scheduled - WhatsApp Analytics".to_string(),
        "New Post Scheduled",
        &body,
    )
}

/// Tells the owner about a terminal status. Other statuses send nothing.
#[must_use]
pub fn post_status(post: &PostNotice, status: PostStatus) -> Option<Email> {
    let (tone, subject, heading, line, footer) = match status {
        PostStatus::Completed => (
            Tone::Success,
            "Post Completed Successfully - WhatsApp Analytics",
            "Post Completed Successfully!",
            "your scheduled post has been completed successfully.",
            "Your post has been sent to all target WhatsApp groups.",
        ),
        PostStatus::Failed => (
            Tone::Error,
            "Post Failed - WhatsApp Analytics",
            "Post Failed",
            "your scheduled post has failed to send.",
            "Please contact support if you need assistance with this issue.",
        ),
        PostStatus::Cancelled => (
            Tone::Warning,
            "Post Cancelled - WhatsApp Analytics",
            "Post Cancelled",
            "your scheduled post has been cancelled.",
            "You can create a new post if needed.",
        ),
        PostStatus::Pending | PostStatus::Running => return None,
    };
    let body = format!(
        "<p>Hi {}, {line}</p>{}<p>{footer}</p>",
        escape(&post.username),
        details(&[
            ("Post Title", post.title.clone()),
            ("Assembly", post.assembly_name.clone()),
            (
                "Completed At",
                post.completed_at.clone().unwrap_or_else(|| "N/A".to_string()),
            ),
            ("Status", status.as_str().to_uppercase()),
            (
                "Admin Notes",
                post.admin_notes
                    .clone()
                    .unwrap_or_else(|| "No additional notes".to_string()),
            ),
        ])
    );
    Some(wrap(tone, subject.to_string(), heading, &body))
}

#[must_use]
pub fn admin_post_failed(post: &PostNotice) -> Email {
    let body = format!(
        "<p>A scheduled post has failed to send:</p>{}<p>Please review and take necessary action.</p>",
        details(&[
            ("User", format!("{} ({})", post.username, post.user_email)),
            ("Post Title", post.title.clone()),
            ("Post ID", post.post_id.to_string()),
            ("Assembly", post.assembly_name.clone()),
            (
                "Admin Notes",
                post.admin_notes
                    .clone()
                    .unwrap_or_else(|| "No additional notes".to_string()),
            ),
        ])
    );
    wrap(
        Tone::Error,
        format!("Post Failed - {}", post.title),
        "Post Failed",
        &body,
    )
}

/// Announcement for the broadcast list. `delivery` is `Scheduled` for a new
/// post and `Immediate` once it has gone out.
#[must_use]
pub fn broadcast(post: &PostNotice, delivery: &str) -> Email {
    let body = format!(
        "<p>A post has been sent to WhatsApp groups:</p>{}",
        details(&[
            ("Title", post.title.clone()),
            (
                "Sent Date & Time",
                format!("{} at {}", post.scheduled_date, post.scheduled_time),
            ),
            ("Assembly", post.assembly_name.clone()),
            ("Target Groups", format!("{} groups", post.group_count)),
            ("Sent By", post.username.clone()),
            ("Post ID", post.post_id.to_string()),
            ("Message Preview", post.preview()),
            ("Attached Files", post.media_files()),
            ("Delivery Time", delivery.to_string()),
        ])
    );
    wrap(
        Tone::Success,
        format!("New Post Sent: {}", post.title),
        "New Post Sent Successfully!",
        &body,
    )
}

#[must_use]
pub fn post_deleted(post: &PostNotice, recipient_name: &str, by: DeletedBy) -> Email {
    let line = match by {
        DeletedBy::Admin => "an administrator deleted your scheduled post.",
        DeletedBy::Owner => "a user deleted one of their scheduled posts.",
    };
    let body = format!(
        "<p>Hi {}, {line}</p>{}",
        escape(recipient_name),
        details(&[
            ("Post Title", post.title.clone()),
            ("Assembly", post.assembly_name.clone()),
            ("User", format!("{} ({})", post.username, post.user_email)),
            ("Post ID", post.post_id.to_string()),
        ])
    );
    wrap(
        Tone::Warning,
        format!("Post Deleted - {}", post.title),
        "Post Deleted",
        &body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> PostNotice {
        PostNotice {
            post_id: 7,
            title: "Ward <update>".to_string(),
            assembly_name: "North".to_string(),
            scheduled_date: "2025-01-20".to_string(),
            scheduled_time: "09:30".to_string(),
            group_count: 2,
            message: "x".repeat(120),
            media: vec!["Image", "Video"],
            username: "asha".to_string(),
            user_email: "asha@example.com".to_string(),
            ..PostNotice::default()
        }
    }

    #[test]
    fn footer_carries_brand_color() {
        let email = welcome("asha");
        assert!(email.html.contains("color: #25D366;\">WhatsApp Analytics Dashboard</strong>"));
    }

    #[test]
    fn values_are_escaped() {
        let email = post_scheduled(&notice());
        assert!(email.html.contains("Ward &lt;update&gt;"));
        assert!(!email.html.contains("<update>"));
    }

    #[test]
    fn long_messages_are_previewed() {
        let email = post_scheduled(&notice());
        assert!(email.html.contains(&format!("{}...", "x".repeat(100))));
        assert!(email.html.contains("Image, Video"));
    }

    #[test]
    fn only_terminal_statuses_notify() {
        assert!(post_status(&notice(), PostStatus::Running).is_none());
        let email = post_status(&notice(), PostStatus::Failed).unwrap();
        assert_eq!(email.subject, "Post Failed - WhatsApp Analytics");
        assert!(email.html.contains("FAILED"));
        assert!(email.html.contains("No additional notes"));
    }

    #[test]
    fn broadcast_subject_names_the_post() {
        assert_eq!(
            broadcast(&notice(), "Scheduled").subject,
            "New Post Sent: Ward <update>"
        );
    }
}

use std::path::PathBuf;

use wadash_core::PostStatus;

use crate::mailer::Mailer;
use crate::recipients::read_recipients;
use crate::templates::{self, DeletedBy, Email, PostNotice};
use crate::NotifyError;

/// Counts of attempted deliveries for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Routes post events to the owner, the admin address and the broadcast list.
#[derive(Debug)]
pub struct Notifier {
    mailer: Mailer,
    recipients_path: PathBuf,
    admin_email: Option<String>,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Mailer, recipients_path: PathBuf, admin_email: Option<String>) -> Self {
        Self {
            mailer,
            recipients_path,
            admin_email,
        }
    }

    #[must_use]
    pub fn admin_email(&self) -> Option<&str> {
        self.admin_email.as_deref()
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    /// Owner confirmation, admin heads-up and a broadcast.
    #[must_use]
    pub fn post_created(&self, post: &PostNotice) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        self.deliver(&mut report, &post.user_email, &templates::post_scheduled(post));
        self.deliver_admin(&mut report, &templates::admin_post_scheduled(post));
        self.broadcast(&mut report, &templates::broadcast(post, "Scheduled"));
        report
    }

    /// Terminal statuses notify the owner; failures also reach the admin and
    /// completions the broadcast list.
    #[must_use]
    pub fn status_changed(&self, post: &PostNotice, status: PostStatus) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let Some(email) = templates::post_status(post, status) else {
            return report;
        };
        self.deliver(&mut report, &post.user_email, &email);
        match status {
            PostStatus::Failed => {
                self.deliver_admin(&mut report, &templates::admin_post_failed(post));
            }
            PostStatus::Completed => {
                self.broadcast(&mut report, &templates::broadcast(post, "Immediate"));
            }
            _ => {}
        }
        report
    }

    /// An admin deletion tells the owner; an owner deletion tells the admin.
    #[must_use]
    pub fn post_deleted(&self, post: &PostNotice, by: DeletedBy) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        match by {
            DeletedBy::Admin => {
                let email = templates::post_deleted(post, &post.username, by);
                self.deliver(&mut report, &post.user_email, &email);
            }
            DeletedBy::Owner => {
                self.deliver_admin(&mut report, &templates::post_deleted(post, "Admin", by));
            }
        }
        report
    }

    /// # Errors
    ///
    /// Returns the delivery error so the caller can surface it.
    pub fn send_test(&self, to: &str) -> Result<(), NotifyError> {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.mailer
            .send(to, &templates::test_message(&self.mailer.sender(), to, &now))
    }

    /// # Errors
    ///
    /// Returns the delivery error so the caller can surface it.
    pub fn send_welcome(&self, to: &str, username: &str) -> Result<(), NotifyError> {
        self.mailer.send(to, &templates::welcome(username))
    }

    fn deliver(&self, report: &mut DeliveryReport, to: &str, email: &Email) {
        if to.trim().is_empty() {
            return;
        }
        match self.mailer.send(to, email) {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(to, subject = %email.subject, error = %e, "notification failed");
            }
        }
    }

    fn deliver_admin(&self, report: &mut DeliveryReport, email: &Email) {
        match self.admin_email.as_deref() {
            Some(admin) => self.deliver(report, admin, email),
            None => tracing::debug!(subject = %email.subject, "no admin email configured"),
        }
    }

    fn broadcast(&self, report: &mut DeliveryReport, email: &Email) {
        let recipients = read_recipients(&self.recipients_path);
        if recipients.is_empty() {
            tracing::warn!(path = %self.recipients_path.display(), "no broadcast recipients");
            return;
        }
        for to in &recipients {
            self.deliver(report, to, email);
        }
        tracing::info!(sent = report.sent, failed = report.failed, "broadcast finished");
    }
}

//! Email notifications for scheduled-post events.
//!
//! Delivery is synchronous; the server runs every send on a blocking task so
//! a slow or unreachable SMTP relay never holds up a request. Failures are
//! counted and logged, not propagated to the triggering request.

pub mod mailer;
pub mod notifier;
pub mod recipients;
pub mod templates;

use thiserror::Error;

pub use mailer::Mailer;
pub use notifier::{DeliveryReport, Notifier};
pub use recipients::read_recipients;
pub use templates::{DeletedBy, Email, PostNotice};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

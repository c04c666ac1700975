//! Operator notifications.
//!
//! Three email kinds are emitted by the controller: a clean snapshot save,
//! a degraded save with stragglers listed, and a week-without-snapshots
//! outage alert. Delivery is fire-and-forget: every attempt is recorded in
//! the `email_log` audit table and a failed send never fails the tick.

pub mod compose;
pub mod mailer;
pub mod notifier;

pub use compose::{EmailKind, SaveEmailContext, WeekNoUpdateContext};
pub use mailer::{Mailer, MailerConfig, MailerError};
pub use notifier::Notifier;

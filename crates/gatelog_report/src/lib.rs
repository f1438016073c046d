//! # Gatelog Report
//!
//! Daily gate-activity report: HTML rendering, persisted mail settings
//! and a background schedule.
//!
//! The SMTP transport itself stays outside this crate. Callers implement
//! [`Mailer`] with whatever mail library the embedding application uses;
//! tests use [`MockMailer`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod email;
mod error;
mod html;
mod schedule;

pub use email::{
    send_daily_report, EmailSettings, Mailer, MockMailer, OutgoingEmail, ReportRun,
    EMAIL_SETTINGS_KEY,
};
pub use error::{ReportError, ReportResult};
pub use html::{render_report, ReportStats};
pub use schedule::{ReportJob, ReportScheduler, ScheduleStatus};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Mail settings, the mailer seam and the daily-report send path.

use crate::error::{ReportError, ReportResult};
use crate::html::{render_report, ReportStats};
use chrono::{Duration, Local};
use gatelog_core::{CoreResult, LocalStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings key the email configuration is persisted under.
pub const EMAIL_SETTINGS_KEY: &str = "email_settings";

/// SMTP and schedule configuration, persisted as JSON in the local
/// settings store.
///
/// Every field carries a default so a partially saved value (or none at
/// all) still yields a usable struct. Credentials default to empty; the
/// operator fills them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Whether scheduled reporting is active.
    pub enabled: bool,
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    pub port: u16,
    /// Upgrade the connection with STARTTLS.
    pub starttls: bool,
    /// SMTP account.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Display name on outgoing mail.
    pub from_name: String,
    /// Report recipients.
    pub recipients: Vec<String>,
    /// Hour of day (local time) the daily report fires.
    pub schedule_hour: u32,
    /// Minute of the hour the daily report fires.
    pub schedule_minute: u32,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: 587,
            starttls: true,
            username: String::new(),
            password: String::new(),
            from_name: "Gate Security Panel".to_string(),
            recipients: Vec::new(),
            schedule_hour: 18,
            schedule_minute: 0,
        }
    }
}

impl EmailSettings {
    /// Loads the persisted settings, falling back to defaults field by
    /// field (`#[serde(default)]`) or wholesale when nothing valid is
    /// stored.
    pub fn load(store: &dyn LocalStore) -> CoreResult<Self> {
        match store.get_setting(EMAIL_SETTINGS_KEY)? {
            Some(value) => match serde_json::from_value(value) {
                Ok(settings) => Ok(settings),
                Err(e) => {
                    warn!(error = %e, "stored email settings unusable, using defaults");
                    Ok(Self::default())
                }
            },
            None => Ok(Self::default()),
        }
    }

    /// Persists the settings.
    pub fn save(&self, store: &dyn LocalStore) -> CoreResult<()> {
        // Serializing a plain struct of scalars cannot fail.
        let value = serde_json::to_value(self).unwrap_or_default();
        store.set_setting(EMAIL_SETTINGS_KEY, &value)
    }

    /// The `HH:MM` schedule label used in status output.
    pub fn schedule_label(&self) -> String {
        format!("{:02}:{:02}", self.schedule_hour, self.schedule_minute)
    }
}

/// One rendered message ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Display name to send as.
    pub from_name: String,
}

/// The mail transport seam.
///
/// The embedding application implements this over its SMTP library of
/// choice; this crate only renders and routes.
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    fn send(&self, email: &OutgoingEmail) -> Result<(), String>;
}

/// Recording [`Mailer`] double for tests.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: parking_lot::Mutex<Vec<OutgoingEmail>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockMailer {
    /// Creates an empty mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail.
    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

impl Mailer for MockMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err("mock mailer failure".to_string());
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

/// Outcome of one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRun {
    /// The reported calendar day (`YYYY-MM-DD`).
    pub date: String,
    /// The day's counters.
    pub stats: ReportStats,
    /// Recipients the report reached.
    pub sent: Vec<String>,
    /// Recipients that failed, with the transport's message.
    pub failed: Vec<(String, String)>,
}

impl ReportRun {
    /// True when every recipient was reached.
    pub fn all_sent(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Renders and sends the report for `date` (`YYYY-MM-DD`), defaulting to
/// yesterday's local calendar day.
///
/// Each recipient is attempted individually; one bad address does not
/// stop the rest. Per-recipient outcomes come back in the [`ReportRun`].
pub fn send_daily_report(
    store: &dyn LocalStore,
    mailer: &dyn Mailer,
    settings: &EmailSettings,
    date: Option<&str>,
) -> ReportResult<ReportRun> {
    if settings.recipients.is_empty() {
        return Err(ReportError::NoRecipients);
    }

    let date = match date {
        Some(d) => d.to_string(),
        None => (Local::now() - Duration::days(1))
            .format("%Y-%m-%d")
            .to_string(),
    };

    let logs = store.logs_by_date_range(&date, &date)?;
    let stats = ReportStats::from_logs(&logs);
    info!(%date, total = stats.total, "rendering daily report");

    let html = render_report(&logs, &date, stats);
    let subject = format!("Gate Security Report - {date}");

    let mut run = ReportRun {
        date,
        stats,
        sent: Vec::new(),
        failed: Vec::new(),
    };
    for to in &settings.recipients {
        let email = OutgoingEmail {
            to: to.clone(),
            subject: subject.clone(),
            html_body: html.clone(),
            from_name: settings.from_name.clone(),
        };
        match mailer.send(&email) {
            Ok(()) => {
                info!(recipient = %to, "report sent");
                run.sent.push(to.clone());
            }
            Err(e) => {
                warn!(recipient = %to, error = %e, "report send failed");
                run.failed.push((to.clone(), e));
            }
        }
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatelog_core::{LogKind, MemoryStore, NewLog};
    use serde_json::json;

    fn settings_with(recipients: &[&str]) -> EmailSettings {
        EmailSettings {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            ..EmailSettings::default()
        }
    }

    #[test]
    fn settings_roundtrip_through_the_store() {
        let store = MemoryStore::new();
        let settings = EmailSettings {
            enabled: true,
            host: "smtp.example.com".into(),
            recipients: vec!["ops@example.com".into()],
            ..EmailSettings::default()
        };
        settings.save(&store).unwrap();
        assert_eq!(EmailSettings::load(&store).unwrap(), settings);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store
            .set_setting(EMAIL_SETTINGS_KEY, &json!({"host": "smtp.example.com"}))
            .unwrap();

        let settings = EmailSettings::load(&store).unwrap();
        assert_eq!(settings.host, "smtp.example.com");
        assert_eq!(settings.port, 587);
        assert_eq!(settings.schedule_hour, 18);
        assert!(!settings.enabled);
    }

    #[test]
    fn absent_settings_load_as_defaults() {
        let store = MemoryStore::new();
        let settings = EmailSettings::load(&store).unwrap();
        assert_eq!(settings, EmailSettings::default());
        assert!(settings.password.is_empty());
    }

    #[test]
    fn empty_recipient_list_is_an_error() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();
        let err = send_daily_report(&store, &mailer, &settings_with(&[]), None).unwrap_err();
        assert!(matches!(err, ReportError::NoRecipients));
    }

    #[test]
    fn report_goes_to_every_recipient() {
        let store = MemoryStore::new();
        store
            .insert_log(NewLog {
                plate: Some("34 A 1".into()),
                created_at: Some("2026-08-29T08:00:00.000+00:00".into()),
                ..NewLog::of_kind(LogKind::Vehicle)
            })
            .unwrap();

        let mailer = MockMailer::new();
        let settings = settings_with(&["a@example.com", "b@example.com"]);
        let run =
            send_daily_report(&store, &mailer, &settings, Some("2026-08-29")).unwrap();

        assert!(run.all_sent());
        assert_eq!(run.stats.total, 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[0].subject, "Gate Security Report - 2026-08-29");
        assert!(sent[0].html_body.contains("34 A 1"));
    }

    #[test]
    fn per_recipient_failures_are_collected() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();
        mailer.fail_all();

        let run = send_daily_report(
            &store,
            &mailer,
            &settings_with(&["a@example.com"]),
            Some("2026-08-29"),
        )
        .unwrap();
        assert!(!run.all_sent());
        assert_eq!(run.failed.len(), 1);
        assert_eq!(run.failed[0].0, "a@example.com");
    }
}

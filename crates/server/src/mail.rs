//! Outgoing mail: transports, dispatch and message templates.
//!
//! Service operations never send mail themselves. They return an outbox
//! (`Vec<Mail>`) and the caller hands it to [`Notifier`] once the
//! transaction has committed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use std::sync::{Arc, Mutex};

use crate::config::{SmtpSecurity, SmtpSettings};

/// A plain-text message to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Blocking mail transport. Called from Tokio's blocking pool.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &Mail) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// SMTP delivery through `lettre`.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let builder = match settings.security {
            SmtpSecurity::Tls => SmtpTransport::relay(&settings.host)
                .with_context(|| format!("configuring SMTP relay {}", settings.host))?,
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&settings.host)
                .with_context(|| format!("configuring STARTTLS relay {}", settings.host))?,
            SmtpSecurity::None => SmtpTransport::builder_dangerous(&settings.host),
        };
        let mut builder = builder.port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from: Mailbox = settings
            .from
            .parse()
            .with_context(|| format!("invalid SMTP_FROM {:?}", settings.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("invalid recipient {:?}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .context("building message")?;
        self.transport.send(&message).context("SMTP send")?;
        Ok(())
    }
}

/// Used when SMTP is not configured: mails only show up in the log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        tracing::info!("mail to {} (not sent, SMTP disabled): {}", mail.to, mail.subject);
        Ok(())
    }
}

/// Collects mails in memory. For tests.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("memory mailer poisoned"))?
            .push(mail.clone());
        Ok(())
    }
}

/// Pick the transport from the config.
pub fn build_mailer(smtp: Option<&SmtpSettings>) -> Result<Arc<dyn Mailer>> {
    match smtp {
        Some(settings) => {
            tracing::info!(
                "SMTP enabled: {}:{} ({:?})",
                settings.host,
                settings.port,
                settings.security
            );
            Ok(Arc::new(SmtpMailer::new(settings)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Hands outboxes to the mailer on the blocking pool.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: impl Into<String>) -> Self {
        Self {
            mailer,
            base_url: base_url.into(),
        }
    }

    /// Send in the background. Failures are logged, never reported back.
    pub fn dispatch(&self, outbox: Vec<Mail>) {
        if outbox.is_empty() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.deliver(outbox).await;
        });
    }

    /// Send and wait. Returns how many mails the transport accepted.
    pub async fn deliver(&self, outbox: Vec<Mail>) -> usize {
        if outbox.is_empty() {
            return 0;
        }
        let mailer = Arc::clone(&self.mailer);
        let footer = format!("\n\n--\nParty Planner: {}\n", self.base_url);
        let result = tokio::task::spawn_blocking(move || {
            let mut sent = 0;
            for mut mail in outbox {
                mail.body.push_str(&footer);
                match mailer.send(&mail) {
                    Ok(()) => sent += 1,
                    Err(e) => tracing::warn!("mail to {} failed ({}): {e:#}", mail.to, mail.subject),
                }
            }
            sent
        })
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!("mail task failed: {e}");
            0
        })
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn when(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn platform_label(platform: &str) -> &str {
    if platform.is_empty() { "not specified" } else { platform }
}

/// Sent to a user the creator invited.
pub fn invitation(
    to: &str,
    creator: &str,
    title: &str,
    platform: &str,
    scheduled_at: &DateTime<Utc>,
) -> Mail {
    Mail {
        to: to.to_string(),
        subject: format!("Invitation to party: {title}"),
        body: format!(
            "Hello!\n\n{creator} has invited you to join the party '{title}'.\n\n\
             Time: {}\nPlatform: {}\n\n\
             Accept or decline the invitation from your Party Planner account.",
            when(scheduled_at),
            platform_label(platform),
        ),
    }
}

/// Sent to the creator when an invitee answers.
pub fn invite_response(to: &str, invitee: &str, title: &str, accepted: bool) -> Mail {
    let verb = if accepted { "accepted" } else { "declined" };
    Mail {
        to: to.to_string(),
        subject: format!("Response to party invitation: {title}"),
        body: format!("{invitee} has {verb} your invitation to '{title}'."),
    }
}

/// Sent to the creator when someone asks to join.
pub fn join_request(to: &str, requester: &str, title: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: format!("New join request: {title}"),
        body: format!(
            "{requester} has requested to join your party '{title}'.\n\n\
             Review the request from your Party Planner account."
        ),
    }
}

/// Sent to the requester once the creator reviewed the request.
pub fn join_review(to: &str, title: &str, accepted: bool) -> Mail {
    let (subject, body) = if accepted {
        (
            format!("Join request accepted: {title}"),
            format!("Your request to join '{title}' was accepted. See you there!"),
        )
    } else {
        (
            format!("Join request declined: {title}"),
            format!("Your request to join '{title}' was declined."),
        )
    };
    Mail {
        to: to.to_string(),
        subject,
        body,
    }
}

/// Sent to each accepted attendee shortly before the party.
pub fn reminder(
    to: &str,
    username: &str,
    title: &str,
    platform: &str,
    description: &str,
    scheduled_at: &DateTime<Utc>,
) -> Mail {
    Mail {
        to: to.to_string(),
        subject: format!("Reminder: '{title}' starts soon"),
        body: format!(
            "Hello {username}!\n\nThis is a reminder that the party '{title}' starts soon.\n\n\
             Details:\nTime: {}\nPlatform: {}\nDescription: {}\n\n\
             Don't forget to join on time!",
            when(scheduled_at),
            platform_label(platform),
            description,
        ),
    }
}

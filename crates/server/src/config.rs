use anyhow::{anyhow, bail, Result};
use partyplanner_api::crypto::ACCESS_TOKEN_TTL_SECS;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub base_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    /// `None` when `SMTP_HOST` is unset; mails are then only logged.
    pub smtp: Option<SmtpSettings>,
    pub reminder: ReminderSettings,
    pub admin_seed: Option<AdminSeed>,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS (port 465).
    Tls,
    StartTls,
    /// Plaintext, for local catch-all servers.
    None,
}

impl FromStr for SmtpSecurity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => bail!("unknown SMTP security mode: {other}"),
        }
    }
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    /// Time between scans.
    pub interval: Duration,
    /// How far ahead of a party its reminder goes out.
    pub lookahead: chrono::Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lookahead: chrono::Duration::minutes(60),
        }
    }
}

/// Upper bound for minute-valued settings: one year.
const MAX_MINUTES: i64 = 365 * 24 * 60;

/// Admin account created at startup when both variables are set.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get("PARTYPLANNER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let port: u16 = parse_or(get("PORT"), "PORT", 8000)?;
        let base_url = get("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        let token_minutes: u64 = parse_or(
            get("ACCESS_TOKEN_EXPIRE_MINUTES"),
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            ACCESS_TOKEN_TTL_SECS / 60,
        )?;
        if token_minutes == 0 || token_minutes > MAX_MINUTES as u64 {
            bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_MINUTES}");
        }
        let Some(token_ttl_secs) = token_minutes.checked_mul(60) else {
            bail!("ACCESS_TOKEN_EXPIRE_MINUTES is too large");
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_or(get("SMTP_PORT"), "SMTP_PORT", 465)?,
                security: parse_or(get("SMTP_SECURITY"), "SMTP_SECURITY", SmtpSecurity::Tls)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: get("SMTP_FROM")
                    .unwrap_or_else(|| "Party Planner <noreply@localhost>".to_string()),
            }),
            None => None,
        };

        let interval_secs: u64 =
            parse_or(get("REMINDER_INTERVAL_SECS"), "REMINDER_INTERVAL_SECS", 60)?;
        let lookahead_minutes: i64 = parse_or(
            get("REMINDER_LOOKAHEAD_MINUTES"),
            "REMINDER_LOOKAHEAD_MINUTES",
            60,
        )?;
        if interval_secs == 0 || interval_secs > MAX_MINUTES as u64 * 60 {
            bail!("REMINDER_INTERVAL_SECS must be between 1 and {}", MAX_MINUTES * 60);
        }
        if lookahead_minutes <= 0 || lookahead_minutes > MAX_MINUTES {
            bail!("REMINDER_LOOKAHEAD_MINUTES must be between 1 and {MAX_MINUTES}");
        }
        let lookahead = chrono::Duration::try_minutes(lookahead_minutes)
            .ok_or_else(|| anyhow!("REMINDER_LOOKAHEAD_MINUTES is out of range"))?;

        let admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            data_dir,
            port,
            base_url,
            jwt_secret: get("JWT_SECRET").unwrap_or_default(),
            token_ttl_secs,
            smtp,
            reminder: ReminderSettings {
                interval: Duration::from_secs(interval_secs),
                lookahead,
            },
            admin_seed,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

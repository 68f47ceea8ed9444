//! Periodic reminder mails for upcoming parties.
//!
//! A party is reminded once per schedule: `parties.reminder_sent_for`
//! records the `scheduled_at` value the last reminder went out for, and
//! changing the schedule clears it.

use chrono::{DateTime, Utc};
use partyplanner_api::{db, service, ServiceError, ServiceResult};
use rusqlite::Connection;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ReminderSettings;
use crate::mail::{self, Mail, Notifier};
use crate::storage::{sq_execute, sq_query_map, Db};

struct DueParty {
    id: String,
    title: String,
    platform: String,
    description: String,
    /// Stored text, written back verbatim as the dedupe marker.
    scheduled_raw: String,
}

/// Find parties starting in `(now, now + lookahead]` that were not reminded
/// for their current schedule, mark them, and return one mail per accepted
/// attendee.
pub fn collect_due_reminders(
    conn: &Connection,
    now: DateTime<Utc>,
    lookahead: chrono::Duration,
) -> ServiceResult<Vec<Mail>> {
    let after = service::to_db_timestamp(&now);
    let until = service::to_db_timestamp(&(now + lookahead));
    let due = sq_query_map(conn, db::parties::due_for_reminder(&after, &until), |row| {
        Ok(DueParty {
            id: row.get(0)?,
            title: row.get(1)?,
            platform: row.get(2)?,
            description: row.get(3)?,
            scheduled_raw: row.get(4)?,
        })
    })
    .map_err(ServiceError::from_db("scan due parties"))?;

    let mut outbox = Vec::new();
    for party in due {
        let scheduled_at = service::from_db_timestamp(&party.scheduled_raw)?;
        let attendees: Vec<(String, String)> =
            sq_query_map(conn, db::invitations::attendees(&party.id), |row| {
                Ok((row.get(1)?, row.get(2)?))
            })
            .map_err(ServiceError::from_db("list attendees"))?;

        for (username, email) in &attendees {
            outbox.push(mail::reminder(
                email,
                username,
                &party.title,
                &party.platform,
                &party.description,
                &scheduled_at,
            ));
        }
        sq_execute(conn, db::parties::mark_reminded(&party.id, &party.scheduled_raw))
            .map_err(ServiceError::from_db("mark party reminded"))?;
        debug!(
            "reminder queued for {} ({}): {} attendee(s)",
            party.title,
            party.id,
            attendees.len()
        );
    }
    Ok(outbox)
}

/// One scan: mark due parties in a transaction, then deliver.
///
/// Returns the number of mails the transport accepted.
pub async fn run_once(
    db: &Db,
    notifier: &Notifier,
    lookahead: chrono::Duration,
) -> ServiceResult<usize> {
    let outbox = db.transact(|conn| collect_due_reminders(conn, Utc::now(), lookahead))?;
    if outbox.is_empty() {
        return Ok(0);
    }
    let queued = outbox.len();
    let sent = notifier.deliver(outbox).await;
    info!("reminders sent: {sent}/{queued}");
    Ok(sent)
}

/// Scan every `settings.interval` until `shutdown` flips to `true`.
pub async fn run_reminder_job(
    db: Db,
    notifier: Notifier,
    settings: ReminderSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        "reminder job started (every {}s, {} min ahead)",
        settings.interval.as_secs(),
        settings.lookahead.num_minutes()
    );
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_once(&db, &notifier, settings.lookahead).await {
                    warn!("reminder scan failed: {e}");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("reminder job stopped");
}

//! Daily release-reminder sweep.
//!
//! A reminder is claimed (its sent flag flipped) before the mail goes out, so
//! two overlapping sweeps can never both deliver it. A failed delivery keeps
//! the flag set: at most one notification per (movie, user).

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::{Store, StoreError};
use crate::mailer::{self, Mailer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub delivered: usize,
}

/// `[today, tomorrow)` as calendar dates in `tz`.
pub fn today_window(now: DateTime<Utc>, tz: Tz) -> (NaiveDate, NaiveDate) {
    let today = now.with_timezone(&tz).date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    (today, tomorrow)
}

/// Deliver every unsent reminder for movies releasing in `[from, until)`.
///
/// Fails only when the due reminders cannot be listed, before any flag changes.
pub async fn run_sweep(
    store: &dyn Store,
    mailer: &dyn Mailer,
    (from, until): (NaiveDate, NaiveDate),
) -> Result<SweepReport, StoreError> {
    let due = store.due_reminders(from, until).await?;
    tracing::info!(count = due.len(), %from, "Release reminders due");

    let mut report = SweepReport::default();
    for reminder in due {
        match store.claim_reminder(reminder.movie_id, reminder.user_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(movie_id = %reminder.movie_id, "Reminder already claimed");
                continue;
            }
            Err(e) => {
                tracing::error!(
                    movie_id = %reminder.movie_id,
                    user_id = %reminder.user_id,
                    error = %e,
                    "Failed to claim reminder"
                );
                continue;
            }
        }

        let message =
            mailer::release_reminder(&reminder.email, &reminder.title, reminder.release_date);
        match mailer.send(message).await {
            Ok(()) => report.delivered += 1,
            Err(e) => tracing::warn!(
                movie_id = %reminder.movie_id,
                user_id = %reminder.user_id,
                error = %e,
                "Release reminder not delivered"
            ),
        }
    }

    tracing::info!(delivered = report.delivered, "Release reminder sweep finished");
    Ok(report)
}

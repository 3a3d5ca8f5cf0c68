use chrono::{DateTime, NaiveDate, Utc};

use crate::db::models::StreakRow;
use crate::db::Db;
use crate::errors::Result;

// ---------------------------------------------------------------------------
// Streak transition
// ---------------------------------------------------------------------------

/// Next `day_streak` value when a submission lands at `now`, given the
/// previous submission time and streak. A second submission on the same day
/// leaves the streak alone; a gap of two or more days restarts it at 1.
pub fn advance(
    last_result_posted: Option<DateTime<Utc>>,
    day_streak: i64,
    now: DateTime<Utc>,
) -> i64 {
    let today = now.date_naive();

    match last_result_posted {
        None => 1,
        Some(prior) => {
            let prior_day = prior.date_naive();
            if prior_day == today {
                day_streak
            } else if Some(prior_day) == today.pred_opt() {
                day_streak + 1
            } else {
                1
            }
        }
    }
}

/// Whether the sweep should zero this streak at `today`: stale means no
/// result on `today` or the day before.
pub fn is_stale(last_result_posted: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    match last_result_posted {
        None => true,
        Some(prior) => match today.pred_opt() {
            Some(yesterday) => prior.date_naive() < yesterday,
            None => false,
        },
    }
}

// ---------------------------------------------------------------------------
// StreakRepository trait (DIP: service defines the abstraction it needs)
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait StreakRepository: Send + Sync {
    fn list_patient_streaks(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<StreakRow>>> + Send;

    fn reset_streak(&self, user_id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl StreakRepository for Db {
    fn list_patient_streaks(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<StreakRow>>> + Send {
        Db::list_patient_streaks(self)
    }

    fn reset_streak(&self, user_id: i64) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::reset_streak(self, user_id)
    }
}

// ---------------------------------------------------------------------------
// StreakSweep
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub checked: usize,
    pub zeroed: usize,
    pub failed: usize,
}

/// Nightly job zeroing the streak of every patient who has gone quiet. The
/// increment logic only runs on submission, so this is what ends a streak
/// for users who never come back.
pub struct StreakSweep<R: StreakRepository = Db> {
    repo: R,
}

impl<R: StreakRepository> StreakSweep<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// One full pass over all patients. A persistence failure for one user
    /// is logged and skipped; the sweep keeps going.
    pub async fn run(&self, today: NaiveDate) -> Result<SweepOutcome> {
        let rows = self.repo.list_patient_streaks().await?;
        let mut outcome = SweepOutcome {
            checked: rows.len(),
            ..Default::default()
        };

        for row in rows {
            if row.day_streak == 0 || !is_stale(row.last_result_posted, today) {
                continue;
            }

            match self.repo.reset_streak(row.id).await {
                Ok(()) => outcome.zeroed += 1,
                Err(e) => {
                    tracing::warn!("streak sweep skipped user {}: {e}", row.id);
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(
            "streak sweep finished: checked={}, zeroed={}, failed={}",
            outcome.checked,
            outcome.zeroed,
            outcome.failed
        );
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use ulid::Ulid;

use super::models::{PatientOverview, StreakRow, User};
use super::Db;
use crate::errors::{AppError, Result};
use crate::names;

const USER_COLUMNS: &str = "id, email, name, is_therapist, therapist_code, assigned_to, assignment_active, day_streak, last_result_posted, notes, diagnosis";

impl Db {
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Create a therapist account with a freshly issued link code.
    pub async fn create_therapist(&self, email: &str, name: &str) -> Result<User> {
        if self.email_exists(email).await? {
            return Err(AppError::Validation(format!(
                "email '{email}' is already in use"
            )));
        }

        let code = new_therapist_code();
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, name, is_therapist, therapist_code, created_at) VALUES (?, ?, TRUE, ?, ?) RETURNING id",
        )
        .bind(email)
        .bind(name)
        .bind(&code)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("new therapist created: id={user_id}, email={email}");
        self.get_user(user_id).await
    }

    pub async fn create_patient(&self, email: &str, name: &str) -> Result<User> {
        if self.email_exists(email).await? {
            return Err(AppError::Validation(format!(
                "email '{email}' is already in use"
            )));
        }

        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, name, is_therapist, created_at) VALUES (?, ?, FALSE, ?) RETURNING id",
        )
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("new patient created: id={user_id}, email={email}");
        self.get_user(user_id).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_therapist_by_code(&self, code: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE therapist_code = ? AND is_therapist = TRUE"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Record a pending link request: the patient points at the therapist,
    /// active only once the therapist accepts.
    pub async fn set_pending_link(&self, patient_id: i64, therapist_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET assigned_to = ?, assignment_active = FALSE WHERE id = ?")
            .bind(therapist_id)
            .bind(patient_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("link requested: patient={patient_id}, therapist={therapist_id}");
        Ok(())
    }

    pub async fn activate_link(&self, patient_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET assignment_active = TRUE WHERE id = ?")
            .bind(patient_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("link activated for patient {patient_id}");
        Ok(())
    }

    /// Detach a patient from their therapist: link fields cleared, assigned
    /// tasks emptied, meetings referencing the patient deleted, all in one
    /// transaction.
    pub async fn unlink_patient(&self, patient_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET assigned_to = NULL, assignment_active = FALSE WHERE id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM assigned_tasks WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meetings WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("unlinked patient {patient_id}");
        Ok(())
    }

    pub async fn list_patients(&self, therapist_id: i64) -> Result<Vec<PatientOverview>> {
        let patients = sqlx::query_as::<_, PatientOverview>(
            r#"
            SELECT id, name, email, assignment_active, day_streak, last_result_posted
            FROM users
            WHERE assigned_to = ?
            ORDER BY name
            "#,
        )
        .bind(therapist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(patients)
    }

    pub async fn update_notes(&self, patient_id: i64, notes: &str) -> Result<()> {
        let updated = sqlx::query("UPDATE users SET notes = ? WHERE id = ?")
            .bind(notes)
            .bind(patient_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("user"));
        }

        Ok(())
    }

    pub async fn update_diagnosis(&self, patient_id: i64, diagnosis: &str) -> Result<()> {
        let updated = sqlx::query("UPDATE users SET diagnosis = ? WHERE id = ?")
            .bind(diagnosis)
            .bind(patient_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("user"));
        }

        Ok(())
    }

    /// Stamp the streak fields after a recorded submission.
    pub async fn apply_streak(
        &self,
        user_id: i64,
        day_streak: i64,
        posted_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET day_streak = ?, last_result_posted = ? WHERE id = ?")
            .bind(day_streak)
            .bind(posted_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Zero a stale streak without touching `last_result_posted`.
    pub async fn reset_streak(&self, user_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET day_streak = 0 WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Streak fields of every patient, as scanned by the nightly sweep.
    pub async fn list_patient_streaks(&self) -> Result<Vec<StreakRow>> {
        let rows = sqlx::query_as::<_, StreakRow>(
            "SELECT id, day_streak, last_result_posted FROM users WHERE is_therapist = FALSE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

fn new_therapist_code() -> String {
    let id = Ulid::new().to_string();
    id[id.len() - names::THERAPIST_CODE_LEN..].to_lowercase()
}

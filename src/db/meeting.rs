use chrono::{DateTime, Utc};

use super::models::Meeting;
use super::Db;
use crate::errors::{AppError, Result};

impl Db {
    pub async fn create_meeting(
        &self,
        name: &str,
        created_by: i64,
        patient_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<i64> {
        let meeting_id: i64 = sqlx::query_scalar(
            "INSERT INTO meetings (name, created_by, patient_id, start_time, end_time) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(created_by)
        .bind(patient_id)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("meeting created: meeting_id={meeting_id}, patient={patient_id}");
        Ok(meeting_id)
    }

    pub async fn get_meeting(&self, meeting_id: i64) -> Result<Meeting> {
        sqlx::query_as::<_, Meeting>(
            "SELECT id, name, created_by, patient_id, start_time, end_time FROM meetings WHERE id = ?",
        )
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("meeting"))
    }

    /// Meetings a therapist has scheduled, soonest first.
    pub async fn list_meetings_for_therapist(&self, therapist_id: i64) -> Result<Vec<Meeting>> {
        let meetings = sqlx::query_as::<_, Meeting>(
            "SELECT id, name, created_by, patient_id, start_time, end_time FROM meetings WHERE created_by = ? ORDER BY start_time",
        )
        .bind(therapist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(meetings)
    }

    pub async fn list_meetings_for_patient(&self, patient_id: i64) -> Result<Vec<Meeting>> {
        let meetings = sqlx::query_as::<_, Meeting>(
            "SELECT id, name, created_by, patient_id, start_time, end_time FROM meetings WHERE patient_id = ? ORDER BY start_time",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(meetings)
    }

    pub async fn delete_meeting(&self, meeting_id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM meetings WHERE id = ?")
            .bind(meeting_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("meeting"));
        }

        tracing::info!("deleted meeting {meeting_id}");
        Ok(())
    }
}

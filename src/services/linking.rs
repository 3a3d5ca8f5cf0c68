use chrono::{DateTime, Utc};

use crate::db::models::{Meeting, Task, User};
use crate::db::Db;
use crate::errors::{AppError, Result};

// ---------------------------------------------------------------------------
// LinkingRepository trait (DIP: service defines the abstraction it needs)
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait LinkingRepository: Send + Sync {
    fn get_user(&self, user_id: i64) -> impl std::future::Future<Output = Result<User>> + Send;

    fn find_therapist_by_code(
        &self,
        code: String,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    fn set_pending_link(
        &self,
        patient_id: i64,
        therapist_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn activate_link(
        &self,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn unlink_patient(
        &self,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_task(&self, task_id: i64) -> impl std::future::Future<Output = Result<Task>> + Send;

    fn assign_task(
        &self,
        task_id: i64,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn unassign_task(
        &self,
        task_id: i64,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn create_meeting(
        &self,
        name: String,
        created_by: i64,
        patient_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    fn get_meeting(
        &self,
        meeting_id: i64,
    ) -> impl std::future::Future<Output = Result<Meeting>> + Send;

    fn delete_meeting(
        &self,
        meeting_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl LinkingRepository for Db {
    fn get_user(&self, user_id: i64) -> impl std::future::Future<Output = Result<User>> + Send {
        Db::get_user(self, user_id)
    }

    fn find_therapist_by_code(
        &self,
        code: String,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send {
        async move { Db::find_therapist_by_code(self, &code).await }
    }

    fn set_pending_link(
        &self,
        patient_id: i64,
        therapist_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::set_pending_link(self, patient_id, therapist_id)
    }

    fn activate_link(
        &self,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::activate_link(self, patient_id)
    }

    fn unlink_patient(
        &self,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::unlink_patient(self, patient_id)
    }

    fn get_task(&self, task_id: i64) -> impl std::future::Future<Output = Result<Task>> + Send {
        Db::get_task(self, task_id)
    }

    fn assign_task(
        &self,
        task_id: i64,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::assign_task(self, task_id, patient_id)
    }

    fn unassign_task(
        &self,
        task_id: i64,
        patient_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::unassign_task(self, task_id, patient_id)
    }

    fn create_meeting(
        &self,
        name: String,
        created_by: i64,
        patient_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<i64>> + Send {
        async move {
            Db::create_meeting(self, &name, created_by, patient_id, start_time, end_time).await
        }
    }

    fn get_meeting(
        &self,
        meeting_id: i64,
    ) -> impl std::future::Future<Output = Result<Meeting>> + Send {
        Db::get_meeting(self, meeting_id)
    }

    fn delete_meeting(
        &self,
        meeting_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::delete_meeting(self, meeting_id)
    }
}

// ---------------------------------------------------------------------------
// LinkingManager
// ---------------------------------------------------------------------------

/// Associates patients with therapists and tasks. Linking is two-phase: a
/// patient submits a therapist's code, which records a pending link; the
/// therapist then accepts, which activates it.
pub struct LinkingManager<R: LinkingRepository = Db> {
    repo: R,
    default_content_owner: i64,
}

impl<R: LinkingRepository> LinkingManager<R> {
    pub fn new(repo: R, default_content_owner: i64) -> Self {
        Self {
            repo,
            default_content_owner,
        }
    }

    /// Patient submits a therapist code. Returns the therapist's id on
    /// success; the link stays pending until accepted.
    pub async fn request_link(&self, patient_id: i64, code: &str) -> Result<i64> {
        let patient = self.repo.get_user(patient_id).await?;
        if patient.is_therapist {
            return Err(AppError::Validation(
                "only patients can link to a therapist".into(),
            ));
        }
        if patient.assigned_to.is_some() {
            return Err(AppError::Validation(
                "patient is already linked to a therapist; unlink first".into(),
            ));
        }

        let therapist = self
            .repo
            .find_therapist_by_code(code.to_string())
            .await?
            .ok_or(AppError::LinkCodeInvalid)?;

        self.repo.set_pending_link(patient.id, therapist.id).await?;
        Ok(therapist.id)
    }

    /// Therapist accepts a pending link, activating it.
    pub async fn accept_link(&self, therapist_id: i64, patient_id: i64) -> Result<()> {
        let therapist = self.repo.get_user(therapist_id).await?;
        if !therapist.is_therapist {
            return Err(AppError::Validation("only therapists can accept links".into()));
        }

        let patient = self.repo.get_user(patient_id).await?;
        if patient.assigned_to != Some(therapist_id) {
            return Err(AppError::Validation(
                "patient has not requested a link with this therapist".into(),
            ));
        }

        self.repo.activate_link(patient_id).await
    }

    /// Detach a patient from their therapist. Assigned tasks and scheduled
    /// meetings for the patient go away with the link.
    pub async fn unlink(&self, patient_id: i64) -> Result<()> {
        let patient = self.repo.get_user(patient_id).await?;
        if patient.assigned_to.is_none() {
            return Err(AppError::Validation(
                "patient is not linked to a therapist".into(),
            ));
        }

        self.repo.unlink_patient(patient_id).await
    }

    /// Therapist puts one of their own tasks, or a shared-catalogue task,
    /// on an actively linked patient's list.
    pub async fn assign_task(&self, therapist_id: i64, patient_id: i64, task_id: i64) -> Result<()> {
        self.ensure_active_link(therapist_id, patient_id).await?;

        let task = self.repo.get_task(task_id).await?;
        if task.created_by != therapist_id && task.created_by != self.default_content_owner {
            return Err(AppError::Validation(
                "task does not belong to this therapist or the shared catalogue".into(),
            ));
        }

        self.repo.assign_task(task_id, patient_id).await
    }

    pub async fn unassign_task(
        &self,
        therapist_id: i64,
        patient_id: i64,
        task_id: i64,
    ) -> Result<()> {
        self.ensure_active_link(therapist_id, patient_id).await?;
        self.repo.unassign_task(task_id, patient_id).await
    }

    pub async fn schedule_meeting(
        &self,
        therapist_id: i64,
        patient_id: i64,
        name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("meeting name must not be empty".into()));
        }
        if end_time <= start_time {
            return Err(AppError::Validation(
                "meeting must end after it starts".into(),
            ));
        }
        self.ensure_active_link(therapist_id, patient_id).await?;

        self.repo
            .create_meeting(name.to_string(), therapist_id, patient_id, start_time, end_time)
            .await
    }

    /// Either side of the meeting may cancel it.
    pub async fn cancel_meeting(&self, requester_id: i64, meeting_id: i64) -> Result<()> {
        let meeting = self.repo.get_meeting(meeting_id).await?;
        if meeting.created_by != requester_id && meeting.patient_id != requester_id {
            return Err(AppError::Validation(
                "only the meeting's therapist or patient may cancel it".into(),
            ));
        }

        self.repo.delete_meeting(meeting_id).await
    }

    async fn ensure_active_link(&self, therapist_id: i64, patient_id: i64) -> Result<()> {
        let patient = self.repo.get_user(patient_id).await?;
        if patient.assigned_to != Some(therapist_id) || !patient.assignment_active {
            return Err(AppError::Validation(
                "patient is not actively linked to this therapist".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

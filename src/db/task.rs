use std::collections::HashMap;

use super::models::{
    FourChoice, NewQuestion, PairChoice, Question, QuestionDetail, Task, TaskDetail,
};
use super::Db;
use crate::errors::{AppError, Result};

impl Db {
    /// Persist a fully built task graph atomically: the task row, its
    /// questions and choices, the attachment marks for every consumed
    /// content item, and the task's tags.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_task_with_questions(
        &self,
        name: &str,
        kind: &str,
        difficulty: &str,
        created_by: i64,
        is_custom: bool,
        tags: &[String],
        questions: &[NewQuestion],
        consumed_items: &[i64],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let task_id: i64 = sqlx::query_scalar(
            "INSERT INTO tasks (name, kind, difficulty, created_by, is_custom, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(kind)
        .bind(difficulty)
        .bind(created_by)
        .bind(is_custom)
        .bind(chrono::Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_questions_tx(&mut tx, task_id, questions).await?;
        Self::insert_attachments_tx(&mut tx, task_id, consumed_items).await?;
        Self::link_task_tags_tx(&mut tx, task_id, created_by, tags).await?;

        tx.commit().await?;

        tracing::info!(
            "task created: task_id={task_id}, kind={kind}, questions={}, custom={is_custom}",
            questions.len()
        );
        Ok(task_id)
    }

    /// Swap a task's question set for a new one. The previous questions,
    /// their choices and the task's attachment marks go away in the same
    /// transaction that writes the replacements.
    pub async fn replace_task_questions(
        &self,
        task_id: i64,
        is_custom: bool,
        tags: &[String],
        questions: &[NewQuestion],
        consumed_items: &[i64],
    ) -> Result<()> {
        let owner: i64 = sqlx::query_scalar("SELECT created_by FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("task"))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM questions WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM content_attachments WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE tasks SET is_custom = ? WHERE id = ?")
            .bind(is_custom)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        Self::insert_questions_tx(&mut tx, task_id, questions).await?;
        Self::insert_attachments_tx(&mut tx, task_id, consumed_items).await?;
        Self::link_task_tags_tx(&mut tx, task_id, owner, tags).await?;

        tx.commit().await?;

        tracing::info!(
            "task questions replaced: task_id={task_id}, questions={}",
            questions.len()
        );
        Ok(())
    }

    async fn insert_questions_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        task_id: i64,
        questions: &[NewQuestion],
    ) -> Result<()> {
        for (position, question) in questions.iter().enumerate() {
            let question_id: i64 = sqlx::query_scalar(
                "INSERT INTO questions (task_id, position, heading) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(task_id)
            .bind(position as i64)
            .bind(&question.heading)
            .fetch_one(&mut **tx)
            .await?;

            for choice in &question.pair_choices {
                sqlx::query(
                    "INSERT INTO pair_choices (question_id, data1, data2, is_correct) VALUES (?, ?, ?, TRUE)",
                )
                .bind(question_id)
                .bind(&choice.data1)
                .bind(&choice.data2)
                .execute(&mut **tx)
                .await?;
            }

            if let Some(four) = &question.four_choice {
                sqlx::query(
                    "INSERT INTO four_choices (question_id, prompt, correct_option, incorrect1, incorrect2, incorrect3) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(question_id)
                .bind(&four.prompt)
                .bind(&four.correct_option)
                .bind(&four.incorrect1)
                .bind(&four.incorrect2)
                .bind(&four.incorrect3)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }

    async fn insert_attachments_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        task_id: i64,
        item_ids: &[i64],
    ) -> Result<()> {
        for item_id in item_ids {
            sqlx::query(
                "INSERT INTO content_attachments (content_id, task_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(item_id)
            .bind(task_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn link_task_tags_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        task_id: i64,
        owner: i64,
        tags: &[String],
    ) -> Result<()> {
        for tag in tags {
            let tag_id = Self::get_or_create_tag_tx(tx, tag, owner).await?;
            sqlx::query(
                "INSERT INTO task_tags (task_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(task_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Task> {
        sqlx::query_as::<_, Task>(
            "SELECT id, name, kind, difficulty, created_by, is_custom, created_at FROM tasks WHERE id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("task"))
    }

    /// Load a task with its full question/choice graph, questions in
    /// position order.
    pub async fn get_task_detail(&self, task_id: i64) -> Result<TaskDetail> {
        let task = self.get_task(task_id).await?;

        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, task_id, position, heading FROM questions WHERE task_id = ? ORDER BY position",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        let pair_choices = sqlx::query_as::<_, PairChoice>(
            r#"
            SELECT pc.id, pc.question_id, pc.data1, pc.data2, pc.is_correct
            FROM pair_choices pc
            JOIN questions q ON q.id = pc.question_id
            WHERE q.task_id = ?
            ORDER BY pc.id
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        let four_choices = sqlx::query_as::<_, FourChoice>(
            r#"
            SELECT fc.id, fc.question_id, fc.prompt, fc.correct_option,
                   fc.incorrect1, fc.incorrect2, fc.incorrect3
            FROM four_choices fc
            JOIN questions q ON q.id = fc.question_id
            WHERE q.task_id = ?
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        let mut pairs_by_question: HashMap<i64, Vec<PairChoice>> = HashMap::new();
        for choice in pair_choices {
            pairs_by_question
                .entry(choice.question_id)
                .or_default()
                .push(choice);
        }
        let mut four_by_question: HashMap<i64, FourChoice> = four_choices
            .into_iter()
            .map(|fc| (fc.question_id, fc))
            .collect();

        let questions = questions
            .into_iter()
            .map(|question| QuestionDetail {
                pair_choices: pairs_by_question.remove(&question.id).unwrap_or_default(),
                four_choice: four_by_question.remove(&question.id),
                question,
            })
            .collect();

        Ok(TaskDetail { task, questions })
    }

    /// The shared catalogue: non-custom tasks owned by the default content
    /// owner.
    pub async fn list_default_tasks(&self, default_owner: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, name, kind, difficulty, created_by, is_custom, created_at FROM tasks WHERE created_by = ? AND is_custom = FALSE ORDER BY id",
        )
        .bind(default_owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    pub async fn list_custom_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, name, kind, difficulty, created_by, is_custom, created_at FROM tasks WHERE created_by = ? AND is_custom = TRUE ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    pub async fn list_generated_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, name, kind, difficulty, created_by, is_custom, created_at FROM tasks WHERE created_by = ? AND is_custom = FALSE ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// One uniformly chosen task from the shared catalogue.
    pub async fn random_default_task(&self, default_owner: i64) -> Result<Task> {
        sqlx::query_as::<_, Task>(
            "SELECT id, name, kind, difficulty, created_by, is_custom, created_at FROM tasks WHERE created_by = ? AND is_custom = FALSE ORDER BY RANDOM() LIMIT 1",
        )
        .bind(default_owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("task"))
    }

    pub async fn task_has_results(&self, task_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM task_results WHERE task_id = ?)")
                .bind(task_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Tasks stay deletable only until results have been recorded against
    /// them.
    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        if self.task_has_results(task_id).await? {
            return Err(AppError::Validation(
                "task has recorded results and cannot be deleted".into(),
            ));
        }

        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("task"));
        }

        tracing::info!("deleted task {task_id}");
        Ok(())
    }

    pub async fn assign_task(&self, task_id: i64, patient_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO assigned_tasks (task_id, patient_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(task_id)
        .bind(patient_id)
        .execute(&self.pool)
        .await?;

        tracing::info!("assigned task {task_id} to patient {patient_id}");
        Ok(())
    }

    pub async fn unassign_task(&self, task_id: i64, patient_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM assigned_tasks WHERE task_id = ? AND patient_id = ?")
            .bind(task_id)
            .bind(patient_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("unassigned task {task_id} from patient {patient_id}");
        Ok(())
    }

    pub async fn list_assigned_tasks(&self, patient_id: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.name, t.kind, t.difficulty, t.created_by, t.is_custom, t.created_at
            FROM tasks t
            JOIN assigned_tasks a ON a.task_id = t.id
            WHERE a.patient_id = ?
            ORDER BY t.id
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::models::{
    AnsweredQuestionDetail, FourChoiceAnswer, NewAnsweredQuestion, PairAnswer, ResultDetail,
    TaskResult,
};
use super::Db;
use crate::errors::{AppError, Result};

impl Db {
    /// Store one submission as the single result for `(task, user)`. Any
    /// prior result for the pair is deleted in the same transaction, so a
    /// concurrent reader sees either the old result or the new one, never
    /// neither.
    pub async fn replace_task_result(
        &self,
        task_id: i64,
        answered_by: i64,
        date_created: DateTime<Utc>,
        answers: &[NewAnsweredQuestion],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM task_results WHERE task_id = ? AND answered_by = ?")
            .bind(task_id)
            .bind(answered_by)
            .execute(&mut *tx)
            .await?;

        let result_id: i64 = sqlx::query_scalar(
            "INSERT INTO task_results (task_id, answered_by, date_created) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(task_id)
        .bind(answered_by)
        .bind(date_created)
        .fetch_one(&mut *tx)
        .await?;

        for answer in answers {
            let answered_question_id: i64 = sqlx::query_scalar(
                "INSERT INTO answered_questions (result_id, position) VALUES (?, ?) RETURNING id",
            )
            .bind(result_id)
            .bind(answer.position)
            .fetch_one(&mut *tx)
            .await?;

            for pair in &answer.pair_answers {
                sqlx::query(
                    "INSERT INTO pair_answers (answered_question_id, data1, data2, is_correct) VALUES (?, ?, ?, ?)",
                )
                .bind(answered_question_id)
                .bind(&pair.data1)
                .bind(&pair.data2)
                .bind(pair.is_correct)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(four) = &answer.four_choice {
                sqlx::query(
                    r#"
                    INSERT INTO four_choice_answers
                        (answered_question_id, prompt, correct_option, incorrect1, incorrect2, incorrect3, chosen_option, is_correct)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(answered_question_id)
                .bind(&four.prompt)
                .bind(&four.correct_option)
                .bind(&four.incorrect1)
                .bind(&four.incorrect2)
                .bind(&four.incorrect3)
                .bind(&four.chosen_option)
                .bind(four.is_correct)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "result stored: result_id={result_id}, task_id={task_id}, answered_by={answered_by}, questions={}",
            answers.len()
        );
        Ok(result_id)
    }

    pub async fn find_result(&self, task_id: i64, user_id: i64) -> Result<Option<TaskResult>> {
        let result = sqlx::query_as::<_, TaskResult>(
            "SELECT id, task_id, answered_by, date_created FROM task_results WHERE task_id = ? AND answered_by = ?",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_result(&self, result_id: i64) -> Result<TaskResult> {
        sqlx::query_as::<_, TaskResult>(
            "SELECT id, task_id, answered_by, date_created FROM task_results WHERE id = ?",
        )
        .bind(result_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("task result"))
    }

    /// Load one result with its answered questions in position order.
    pub async fn get_result_detail(&self, result_id: i64) -> Result<ResultDetail> {
        let result = self.get_result(result_id).await?;

        let answered: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT id, position FROM answered_questions WHERE result_id = ? ORDER BY position",
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;

        let pair_answers = sqlx::query_as::<_, PairAnswer>(
            r#"
            SELECT pa.id, pa.answered_question_id, pa.data1, pa.data2, pa.is_correct
            FROM pair_answers pa
            JOIN answered_questions aq ON aq.id = pa.answered_question_id
            WHERE aq.result_id = ?
            ORDER BY pa.id
            "#,
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;

        let four_answers = sqlx::query_as::<_, FourChoiceAnswer>(
            r#"
            SELECT fa.id, fa.answered_question_id, fa.prompt, fa.correct_option,
                   fa.incorrect1, fa.incorrect2, fa.incorrect3, fa.chosen_option, fa.is_correct
            FROM four_choice_answers fa
            JOIN answered_questions aq ON aq.id = fa.answered_question_id
            WHERE aq.result_id = ?
            "#,
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;

        let mut pairs_by_question: HashMap<i64, Vec<PairAnswer>> = HashMap::new();
        for answer in pair_answers {
            pairs_by_question
                .entry(answer.answered_question_id)
                .or_default()
                .push(answer);
        }
        let mut four_by_question: HashMap<i64, FourChoiceAnswer> = four_answers
            .into_iter()
            .map(|fa| (fa.answered_question_id, fa))
            .collect();

        let questions = answered
            .into_iter()
            .map(|(id, position)| AnsweredQuestionDetail {
                position,
                pair_answers: pairs_by_question.remove(&id).unwrap_or_default(),
                four_choice: four_by_question.remove(&id),
            })
            .collect();

        Ok(ResultDetail { result, questions })
    }

    pub async fn list_results_for_task(&self, task_id: i64) -> Result<Vec<TaskResult>> {
        let results = sqlx::query_as::<_, TaskResult>(
            "SELECT id, task_id, answered_by, date_created FROM task_results WHERE task_id = ? ORDER BY date_created DESC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    pub async fn list_results_for_user(&self, user_id: i64) -> Result<Vec<TaskResult>> {
        let results = sqlx::query_as::<_, TaskResult>(
            "SELECT id, task_id, answered_by, date_created FROM task_results WHERE answered_by = ? ORDER BY date_created DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    pub async fn delete_result(&self, result_id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM task_results WHERE id = ?")
            .bind(result_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("task result"));
        }

        tracing::info!("deleted task result {result_id}");
        Ok(())
    }
}

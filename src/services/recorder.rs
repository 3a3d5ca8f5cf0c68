use chrono::{DateTime, Utc};

use super::streak;
use crate::db::models::{
    NewAnsweredQuestion, NewFourChoiceAnswer, NewPairAnswer, QuestionDetail, TaskDetail, User,
};
use crate::db::Db;
use crate::errors::{AppError, Result};
use crate::models::{SubmittedQuestion, TaskKind};

// ---------------------------------------------------------------------------
// RecorderRepository trait (DIP: service defines the abstraction it needs)
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait RecorderRepository: Send + Sync {
    fn get_task_detail(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<TaskDetail>> + Send;

    fn get_user(&self, user_id: i64) -> impl std::future::Future<Output = Result<User>> + Send;

    fn store_result(
        &self,
        task_id: i64,
        answered_by: i64,
        date_created: DateTime<Utc>,
        answers: Vec<NewAnsweredQuestion>,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    fn apply_streak(
        &self,
        user_id: i64,
        day_streak: i64,
        posted_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl RecorderRepository for Db {
    fn get_task_detail(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<TaskDetail>> + Send {
        Db::get_task_detail(self, task_id)
    }

    fn get_user(&self, user_id: i64) -> impl std::future::Future<Output = Result<User>> + Send {
        Db::get_user(self, user_id)
    }

    fn store_result(
        &self,
        task_id: i64,
        answered_by: i64,
        date_created: DateTime<Utc>,
        answers: Vec<NewAnsweredQuestion>,
    ) -> impl std::future::Future<Output = Result<i64>> + Send {
        async move {
            self.replace_task_result(task_id, answered_by, date_created, &answers)
                .await
        }
    }

    fn apply_streak(
        &self,
        user_id: i64,
        day_streak: i64,
        posted_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        Db::apply_streak(self, user_id, day_streak, posted_at)
    }
}

// ---------------------------------------------------------------------------
// ResultRecorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedResult {
    pub result_id: i64,
    pub correct: usize,
    pub total: usize,
    pub day_streak: i64,
}

/// Accepts one submission per `(task, user)` pair, scoring it against the
/// stored choices. Resubmitting replaces the earlier result outright.
pub struct ResultRecorder<R: RecorderRepository = Db> {
    repo: R,
}

impl<R: RecorderRepository> ResultRecorder<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validate, score and store a submission, then advance the submitting
    /// user's streak. Correctness is computed here from the stored choices;
    /// any flags the client sent along are ignored.
    pub async fn record(
        &self,
        task_id: i64,
        answered_by: i64,
        submission: Vec<SubmittedQuestion>,
        now: DateTime<Utc>,
    ) -> Result<RecordedResult> {
        let detail = self.repo.get_task_detail(task_id).await?;
        let user = self.repo.get_user(answered_by).await?;
        let kind = TaskKind::from_str(&detail.task.kind)
            .ok_or_else(|| AppError::Validation(format!("unknown task kind '{}'", detail.task.kind)))?;

        let answers = score_submission(kind, &detail.questions, &submission)?;
        let total = answers.len();
        let correct = answers.iter().filter(|a| question_is_correct(a)).count();

        let result_id = self
            .repo
            .store_result(task_id, answered_by, now, answers)
            .await?;

        // The transition compares against the prior last_result_posted; only
        // then do the streak and the stamp move forward together.
        let day_streak = streak::advance(user.last_result_posted, user.day_streak, now);
        self.repo.apply_streak(answered_by, day_streak, now).await?;

        Ok(RecordedResult {
            result_id,
            correct,
            total,
            day_streak,
        })
    }
}

/// One submitted entry per stored question, matched by order. Anything else
/// is rejected before a single row is written.
fn score_submission(
    kind: TaskKind,
    questions: &[QuestionDetail],
    submission: &[SubmittedQuestion],
) -> Result<Vec<NewAnsweredQuestion>> {
    if submission.len() != questions.len() {
        return Err(AppError::Validation(format!(
            "submission has {} entries but the task has {} questions",
            submission.len(),
            questions.len()
        )));
    }

    questions
        .iter()
        .zip(submission)
        .enumerate()
        .map(|(idx, (question, entry))| {
            if kind.is_pair_matching() {
                score_pair_entry(idx, question, entry)
            } else {
                score_four_choice_entry(idx, question, entry)
            }
        })
        .collect()
}

fn score_pair_entry(
    idx: usize,
    question: &QuestionDetail,
    entry: &SubmittedQuestion,
) -> Result<NewAnsweredQuestion> {
    if entry.pairings.is_empty() {
        return Err(AppError::Validation(format!(
            "question {idx}: a pairing submission is required"
        )));
    }

    let pair_answers = entry
        .pairings
        .iter()
        .map(|pairing| {
            let is_correct = question.pair_choices.iter().any(|choice| {
                choice.is_correct
                    && choice.data1 == pairing.data1
                    && choice.data2 == pairing.data2
            });
            NewPairAnswer {
                data1: pairing.data1.clone(),
                data2: pairing.data2.clone(),
                is_correct,
            }
        })
        .collect();

    Ok(NewAnsweredQuestion {
        position: question.question.position,
        pair_answers,
        four_choice: None,
    })
}

fn score_four_choice_entry(
    idx: usize,
    question: &QuestionDetail,
    entry: &SubmittedQuestion,
) -> Result<NewAnsweredQuestion> {
    let stored = question.four_choice.as_ref().ok_or_else(|| {
        AppError::Validation(format!("question {idx}: stored choices are missing"))
    })?;
    let chosen = entry.four_choice.as_ref().ok_or_else(|| {
        AppError::Validation(format!("question {idx}: a chosen option is required"))
    })?;

    let is_correct = chosen.chosen_option == stored.correct_option;

    Ok(NewAnsweredQuestion {
        position: question.question.position,
        pair_answers: Vec::new(),
        four_choice: Some(NewFourChoiceAnswer {
            prompt: stored.prompt.clone(),
            correct_option: stored.correct_option.clone(),
            incorrect1: stored.incorrect1.clone(),
            incorrect2: stored.incorrect2.clone(),
            incorrect3: stored.incorrect3.clone(),
            chosen_option: chosen.chosen_option.clone(),
            is_correct,
        }),
    })
}

fn question_is_correct(answer: &NewAnsweredQuestion) -> bool {
    match &answer.four_choice {
        Some(four) => four.is_correct,
        None => {
            !answer.pair_answers.is_empty() && answer.pair_answers.iter().all(|p| p.is_correct)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::models::{FourChoice, PairChoice, Question, Task};
    use crate::models::{SubmittedFourChoice, SubmittedPairing};
    use crate::names;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn four_choice_question(position: i64, correct: &str) -> QuestionDetail {
        QuestionDetail {
            question: Question {
                id: position + 100,
                task_id: 1,
                position,
                heading: String::new(),
            },
            pair_choices: Vec::new(),
            four_choice: Some(FourChoice {
                id: position + 200,
                question_id: position + 100,
                prompt: format!("prompt-{position}"),
                correct_option: correct.to_string(),
                incorrect1: "wrong-a".into(),
                incorrect2: "wrong-b".into(),
                incorrect3: "wrong-c".into(),
            }),
        }
    }

    fn pair_question(position: i64, sides: &[(&str, &str)]) -> QuestionDetail {
        let pair_choices = sides
            .iter()
            .enumerate()
            .flat_map(|(i, (a, b))| {
                [
                    PairChoice {
                        id: (position * 100 + i as i64) * 2,
                        question_id: position + 100,
                        data1: a.to_string(),
                        data2: b.to_string(),
                        is_correct: true,
                    },
                    PairChoice {
                        id: (position * 100 + i as i64) * 2 + 1,
                        question_id: position + 100,
                        data1: b.to_string(),
                        data2: a.to_string(),
                        is_correct: true,
                    },
                ]
            })
            .collect();

        QuestionDetail {
            question: Question {
                id: position + 100,
                task_id: 1,
                position,
                heading: String::new(),
            },
            pair_choices,
            four_choice: None,
        }
    }

    fn chosen(option: &str) -> SubmittedQuestion {
        SubmittedQuestion {
            pairings: Vec::new(),
            four_choice: Some(SubmittedFourChoice {
                chosen_option: option.to_string(),
            }),
        }
    }

    // ----- scoring tests -----

    #[test]
    fn four_choice_correctness_comes_from_stored_options() {
        let questions = vec![
            four_choice_question(0, "cat"),
            four_choice_question(1, "dog"),
        ];
        let submission = vec![chosen("cat"), chosen("wrong-a")];

        let answers =
            score_submission(TaskKind::FourChoicesImageTexts, &questions, &submission).unwrap();

        assert!(answers[0].four_choice.as_ref().unwrap().is_correct);
        assert!(!answers[1].four_choice.as_ref().unwrap().is_correct);
        assert_eq!(answers[1].four_choice.as_ref().unwrap().correct_option, "dog");
    }

    #[test]
    fn pairing_is_scored_in_either_direction() {
        let questions = vec![pair_question(0, &[("word-1", "image-1"), ("word-2", "image-2")])];
        let submission = vec![SubmittedQuestion {
            pairings: vec![
                SubmittedPairing {
                    data1: "image-1".into(),
                    data2: "word-1".into(),
                },
                SubmittedPairing {
                    data1: "word-2".into(),
                    data2: "image-1".into(),
                },
            ],
            four_choice: None,
        }];

        let answers =
            score_submission(TaskKind::ConnectPairsTextImage, &questions, &submission).unwrap();

        assert!(answers[0].pair_answers[0].is_correct, "reversed pairing counts");
        assert!(!answers[0].pair_answers[1].is_correct, "mismatched pairing does not");
    }

    #[test]
    fn entry_count_must_match_the_question_count() {
        let questions = vec![four_choice_question(0, "cat")];
        let err = score_submission(TaskKind::FourChoicesImageTexts, &questions, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_chosen_option_is_rejected() {
        let questions = vec![four_choice_question(0, "cat")];
        let submission = vec![SubmittedQuestion::default()];
        let err =
            score_submission(TaskKind::FourChoicesImageTexts, &questions, &submission).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    // ----- record flow tests -----

    fn task_detail(questions: Vec<QuestionDetail>) -> TaskDetail {
        TaskDetail {
            task: Task {
                id: 1,
                name: "Animals".into(),
                kind: names::KIND_FOUR_CHOICES_IMAGE_TEXTS.into(),
                difficulty: names::DIFFICULTY_EASY.into(),
                created_by: 1,
                is_custom: false,
                created_at: at(2024, 5, 1),
            },
            questions,
        }
    }

    fn patient(day_streak: i64, last: Option<DateTime<Utc>>) -> User {
        User {
            id: 9,
            email: "pat@example.com".into(),
            name: "Pat".into(),
            is_therapist: false,
            therapist_code: None,
            assigned_to: Some(2),
            assignment_active: true,
            day_streak,
            last_result_posted: last,
            notes: String::new(),
            diagnosis: String::new(),
        }
    }

    #[tokio::test]
    async fn recording_scores_stores_and_advances_the_streak() {
        let mut mock = MockRecorderRepository::new();
        mock.expect_get_task_detail().returning(|_| {
            Box::pin(async { Ok(task_detail(vec![four_choice_question(0, "cat")])) })
        });
        mock.expect_get_user()
            .returning(|_| Box::pin(async { Ok(patient(3, Some(at(2024, 5, 9)))) }));
        mock.expect_store_result()
            .withf(|task_id, answered_by, _, answers| {
                *task_id == 1 && *answered_by == 9 && answers.len() == 1
            })
            .returning(|_, _, _, _| Box::pin(async { Ok(77) }));
        mock.expect_apply_streak()
            .withf(|user_id, day_streak, posted_at| {
                *user_id == 9 && *day_streak == 4 && posted_at.date_naive() == at(2024, 5, 10).date_naive()
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let recorder = ResultRecorder::new(mock);
        let recorded = recorder
            .record(1, 9, vec![chosen("cat")], at(2024, 5, 10))
            .await
            .unwrap();

        assert_eq!(
            recorded,
            RecordedResult {
                result_id: 77,
                correct: 1,
                total: 1,
                day_streak: 4
            }
        );
    }

    #[tokio::test]
    async fn invalid_submission_writes_nothing() {
        let mut mock = MockRecorderRepository::new();
        mock.expect_get_task_detail().returning(|_| {
            Box::pin(async { Ok(task_detail(vec![four_choice_question(0, "cat")])) })
        });
        mock.expect_get_user()
            .returning(|_| Box::pin(async { Ok(patient(0, None)) }));

        let recorder = ResultRecorder::new(mock);
        let err = recorder
            .record(1, 9, Vec::new(), at(2024, 5, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}

// Database model structs

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_therapist: bool,
    pub therapist_code: Option<String>,
    pub assigned_to: Option<i64>,
    pub assignment_active: bool,
    pub day_streak: i64,
    pub last_result_posted: Option<DateTime<Utc>>,
    pub notes: String,
    pub diagnosis: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentItem {
    pub id: i64,
    pub text: String,
    pub counterpart: String,
    pub owner: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub difficulty: String,
    pub created_by: i64,
    pub is_custom: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub task_id: i64,
    pub position: i64,
    pub heading: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PairChoice {
    pub id: i64,
    pub question_id: i64,
    pub data1: String,
    pub data2: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FourChoice {
    pub id: i64,
    pub question_id: i64,
    pub prompt: String,
    pub correct_option: String,
    pub incorrect1: String,
    pub incorrect2: String,
    pub incorrect3: String,
}

/// One question with its stored choices, shaped by the task kind.
pub struct QuestionDetail {
    pub question: Question,
    pub pair_choices: Vec<PairChoice>,
    pub four_choice: Option<FourChoice>,
}

pub struct TaskDetail {
    pub task: Task,
    pub questions: Vec<QuestionDetail>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskResult {
    pub id: i64,
    pub task_id: i64,
    pub answered_by: i64,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PairAnswer {
    pub id: i64,
    pub answered_question_id: i64,
    pub data1: String,
    pub data2: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FourChoiceAnswer {
    pub id: i64,
    pub answered_question_id: i64,
    pub prompt: String,
    pub correct_option: String,
    pub incorrect1: String,
    pub incorrect2: String,
    pub incorrect3: String,
    pub chosen_option: String,
    pub is_correct: bool,
}

pub struct AnsweredQuestionDetail {
    pub position: i64,
    pub pair_answers: Vec<PairAnswer>,
    pub four_choice: Option<FourChoiceAnswer>,
}

pub struct ResultDetail {
    pub result: TaskResult,
    pub questions: Vec<AnsweredQuestionDetail>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Meeting {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub patient_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Roster line for a therapist's patient list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PatientOverview {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub assignment_active: bool,
    pub day_streak: i64,
    pub last_result_posted: Option<DateTime<Utc>>,
}

/// Streak fields of one patient as read by the nightly sweep.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreakRow {
    pub id: i64,
    pub day_streak: i64,
    pub last_result_posted: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Input graphs handed to the persistence layer in one transaction
// ---------------------------------------------------------------------------

/// A fully built question ready to be stored. Exactly one of the choice
/// halves is populated, matching the task kind.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub heading: String,
    pub pair_choices: Vec<NewPairChoice>,
    pub four_choice: Option<NewFourChoice>,
}

#[derive(Debug, Clone)]
pub struct NewPairChoice {
    pub data1: String,
    pub data2: String,
}

#[derive(Debug, Clone)]
pub struct NewFourChoice {
    pub prompt: String,
    pub correct_option: String,
    pub incorrect1: String,
    pub incorrect2: String,
    pub incorrect3: String,
}

/// A scored per-question answer ready to be stored under a task result.
#[derive(Debug, Clone)]
pub struct NewAnsweredQuestion {
    pub position: i64,
    pub pair_answers: Vec<NewPairAnswer>,
    pub four_choice: Option<NewFourChoiceAnswer>,
}

#[derive(Debug, Clone)]
pub struct NewPairAnswer {
    pub data1: String,
    pub data2: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct NewFourChoiceAnswer {
    pub prompt: String,
    pub correct_option: String,
    pub incorrect1: String,
    pub incorrect2: String,
    pub incorrect3: String,
    pub chosen_option: String,
    pub is_correct: bool,
}

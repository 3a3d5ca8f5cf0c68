use crate::models::TaskKind;

/// Errors surfaced by the core workflows. Infrastructure failures ride in
/// `Database`; the other variants are caller-visible rejections and are
/// raised before any partial write.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(
        "not enough content for a {kind} task: {available} items available, {required} required"
    )]
    InsufficientContent {
        kind: TaskKind,
        available: usize,
        required: usize,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("link code does not match any therapist")]
    LinkCodeInvalid,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

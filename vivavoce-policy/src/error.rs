use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("No completed attempts to compute a result from")]
    NoAttempts,

    #[error("Score {0} is outside 0-100")]
    ScoreOutOfRange(f64),

    #[error("Interview session has already ended")]
    SessionEnded,

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Attempt limit of {max} already reached")]
    AttemptLimitReached { max: usize },

    #[error("Attempt belongs to application {got}, ledger is for {expected}")]
    ApplicationMismatch { expected: Uuid, got: Uuid },

    #[error("Attempt completed before the previous one")]
    AttemptOutOfOrder,
}

pub type Result<T> = std::result::Result<T, PolicyError>;

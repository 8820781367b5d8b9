use thiserror::Error;

/// Errors surfaced by top-level activities.
///
/// `Validation` rejects a call before anything is written. Everything that
/// goes wrong after validation is `Internal`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid package name: {0:?}")]
    InvalidPackageName(String),

    #[error("No application found: {0}")]
    ApplicationNotFound(String),

    #[error("Download error: {0}")]
    Transport(String),
}

impl AppError {
    /// Whether the user can correct the problem without a reload.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Transport(_))
    }
}

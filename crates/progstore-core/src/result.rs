//! Convenience result type alias for ProgStore.

use crate::error::AppError;

/// A specialized `Result` type for ProgStore operations.
pub type AppResult<T> = Result<T, AppError>;

//! Convenience result type alias for CallHub.

use crate::error::AppError;

/// A specialized `Result` type for CallHub operations.
pub type AppResult<T> = Result<T, AppError>;

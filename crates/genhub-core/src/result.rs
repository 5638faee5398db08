//! Convenience result type alias for GenHub.

use crate::error::AppError;

/// A specialized `Result` type for GenHub operations.
pub type AppResult<T> = Result<T, AppError>;

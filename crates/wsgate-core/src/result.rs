//! Convenience result type alias for wsgate.

use crate::error::AppError;

/// A specialized `Result` type for wsgate operations.
///
/// Handler callbacks return this type, so application code never needs to
/// spell out `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

//! API route handlers

pub mod error;
pub mod ops;
pub mod system;

pub use error::{ApiError, AppError};

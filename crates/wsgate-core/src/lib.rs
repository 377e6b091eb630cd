//! # wsgate-core
//!
//! Core crate for the wsgate real-time gateway. Contains configuration
//! schemas, typed identifiers with pluggable id generation, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other wsgate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

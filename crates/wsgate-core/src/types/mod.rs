//! Core type definitions used across the wsgate workspace.

pub mod id;

pub use id::*;

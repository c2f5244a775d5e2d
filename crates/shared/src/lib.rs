//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - `Money`, an exact fixed-scale decimal amount
//! - Typed IDs for type-safe entity references, including the tenant key
//! - The error taxonomy shared by every layer
//! - Configuration management and tracing bootstrap

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::AppConfig;
pub use error::{ErrorKind, MoneyError};

//! Core types and shared functionality for refetch.
//!
//! This crate provides:
//! - The unified error taxonomy surfaced by fetch cycles
//! - Configuration structures for the HTTP transport

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::Error;

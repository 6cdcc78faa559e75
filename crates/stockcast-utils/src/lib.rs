//! Shared utilities for stockcast
//!
//! This crate provides the pieces every binary in the workspace needs before
//! it does real work: tracing setup and process-level configuration.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LogFormat};
pub use logging::init_tracing;

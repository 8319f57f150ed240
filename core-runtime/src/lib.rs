//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the decryption core:
//! - Logging and tracing infrastructure
//! - Bridge wiring (DRM engine, license exchange) with fail-fast validation
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the decryption core depends
//! on. It establishes the logging conventions and the way host-provided
//! capabilities are collected before a decryptor is created.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use error::{Error, Result};

//! CLI command implementations.
//!
//! - [`cache`] - Statistics and erasure
//! - [`config`] - Configuration file management (path, show, init)
//! - [`key`] - Cache key derivation

pub mod cache;
pub mod common;
pub mod config;
pub mod key;

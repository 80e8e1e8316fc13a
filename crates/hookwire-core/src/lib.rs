//! # hookwire-core
//!
//! Core crate for hookwire. Contains the configuration schemas and the
//! unified error system shared by the hook engine and its consumers.
//!
//! This crate has **no** internal dependencies on other hookwire crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;

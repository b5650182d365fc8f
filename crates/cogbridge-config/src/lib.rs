//! # cogbridge Config
//!
//! Configuration management for the cogbridge kernel: interrupt-check
//! rate, transport timeout, scheduler defaults and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};

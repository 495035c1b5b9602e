//! Common utilities and types shared across conncheck components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};

//! Common utilities shared by the handler and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

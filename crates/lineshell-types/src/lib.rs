//! Foundation types for lineshell.
//!
//! This crate contains the types shared by every lineshell crate: the error
//! type and the shell configuration loaded from TOML.

pub mod config;
pub mod error;

pub use config::{ReadErrorPolicy, ShellConfig};
pub use error::{Result, ShellError};

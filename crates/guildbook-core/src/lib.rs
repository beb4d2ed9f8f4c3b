//! # guildbook-core
//!
//! Shared foundations for the GuildBook directory access layer.
//!
//! This crate provides the error taxonomy and static configuration used by
//! the directory client crate.
//!
//! ## Modules
//!
//! - [`error`] - Typed directory-layer errors and error codes
//! - [`config`] - Static directory connection settings

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::DirectorySettings;
pub use error::{Error, Result};

//! Shared configuration, error and wire types for the Kodi notification workspace.

pub mod config;
pub mod error;
pub mod types;

//! # VetTrack Common Library
//!
//! Shared code for the VetTrack service:
//! - Database initialization and record models
//! - Configuration resolution
//! - Credential hashing and session tokens
//! - Event types and the broadcast bus
//! - Time helpers

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};

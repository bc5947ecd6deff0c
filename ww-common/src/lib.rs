//! # WordWatch Common Library
//!
//! Shared code for the WordWatch answer pipeline:
//! - Common error and result types
//! - Configuration loading
//! - Database initialization and schema
//! - Game-number calendar (date <-> game number mapping)

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};

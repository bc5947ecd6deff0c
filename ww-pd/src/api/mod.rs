//! HTTP API for the prediction pipeline
//!
//! Read endpoints project the prediction store; trigger endpoints run
//! scheduler tasks on demand and return their structured outcome.

pub mod health;
pub mod predictions;
pub mod tasks;

pub use health::health_routes;
pub use predictions::prediction_routes;
pub use tasks::task_routes;

//! Ralph - iteration controller for an autonomous coding agent

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod prd;
pub mod render;
pub mod subprocess;
pub mod telemetry;

//! Logging and PEM plumbing used across the workspace.

pub mod logging;
pub mod pem_utils;

//! org-steward CLI library exports.
//!
//! The binary in `main.rs` parses the command line and dispatches to the
//! command modules exposed here.

pub mod commands;
pub mod config;
pub mod errors;
pub mod session;

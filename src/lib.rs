//! Streaming Server Admin Backend Library
//!
//! Exposes the auth, stream-key and configuration modules for the
//! `streamadmin` binary and the integration tests.

pub mod auth;
pub mod config_editor;
pub mod middleware;
pub mod settings;
pub mod streams;

//! Middleware modules
//!
//! Contains the shared-secret authentication middleware.

pub mod auth;

//! HTTP handlers
//!
//! Handlers parse and validate input, call a service with a per-request
//! context, and wrap the result in the success envelope. Every failure is a
//! [`postboard::error::Error`], which renders itself as a JSON error body.

pub mod health;
pub mod posts;
pub mod users;

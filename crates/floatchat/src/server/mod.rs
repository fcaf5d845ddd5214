//! REST API module for the floatchat service
//!
//! Provides the HTTP surface consumed by the chat frontend: question
//! answering, file upload, and service health endpoints.

pub mod handlers;
pub mod routing;
pub mod server;
pub mod services;
pub mod types;

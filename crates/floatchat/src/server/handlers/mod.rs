//! HTTP endpoint handlers

pub mod chat;
pub mod status;
pub mod upload;

//! FloatChat - Conversational backend for ARGO float data
//!
//! Answers natural-language questions about oceanographic float data by
//! translating them into SQL through retrieval-augmented generation,
//! executing the query against Postgres, and shaping the results into a
//! summary, a chart-type label, and raw rows for a chat frontend.

pub mod argo;
pub mod config;
pub mod ingest;
pub mod server;

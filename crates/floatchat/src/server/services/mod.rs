//! Services backing the REST endpoints

pub mod database;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod rag;

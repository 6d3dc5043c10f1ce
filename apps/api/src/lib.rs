//! Job search: an HTTP proxy in front of the Adzuna job board, and the
//! client session that consumes it.

pub mod client;
pub mod config;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;

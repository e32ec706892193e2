//! HTTP networking module
//!
//! Provides the HTTP client source adapters use to reach external providers.

mod client;
mod user_agent;

pub use client::HttpClient;
pub use user_agent::generate_user_agent;

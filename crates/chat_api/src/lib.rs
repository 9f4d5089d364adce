//! Transport-only client primitives for the scouting chat service.
//!
//! This crate owns request building, response checking and token-line parsing
//! for the two chat endpoints: the token stream and the single-response
//! fallback. It contains no conversation state and no retry policy; deciding
//! when to fall back is the caller's job.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{tokens_from_chunks, ChatApiClient, StreamResult, TokenStream};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use payload::{ChatCompletion, ChatRequest, ChatRequestMessage};
pub use sse::DataLineParser;
pub use url::join_endpoint;

pub use reqwest::StatusCode;

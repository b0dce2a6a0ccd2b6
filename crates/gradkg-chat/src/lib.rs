//! Regulation chat with external LLMs (Gemini/OpenAI/Anthropic).
//!
//! Each question is routed either to the requirement graph or to passage
//! search, then answered from what was retrieved. LLM calls go to external
//! APIs; no local model required.

pub mod config;
pub mod prompt;
pub mod providers;
pub mod service;
pub mod types;

pub use config::LLMConfig;
pub use providers::{http_client, Completion, HttpCompletion};
pub use service::{ChatService, ChatSettings};
pub use types::*;

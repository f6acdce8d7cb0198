//! LLM provider implementations for weave.
//!
//! Concrete implementations of the [`weave_core::llm::ChatModel`]
//! trait:
//!
//! - [`remote::OpenAiClient`] — any OpenAI-compatible API (chat
//!   completions, speech synthesis, transcription)
//! - [`local::OfflineChatModel`] — a deterministic keyless model that
//!   drives offline tests and the offline agent loop
//!
//! Which implementation a run receives is decided by the server from
//! its configuration; blocks only ever see the trait.

pub mod config;
pub mod local;
pub mod remote;

pub use config::RemoteLlmConfig;
pub use local::OfflineChatModel;
pub use remote::OpenAiClient;

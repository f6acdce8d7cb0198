//! Core contracts for the weave workflow engine.
//!
//! This crate defines the pieces every other crate builds on:
//!
//! - [`graph`] — the workflow graph document (nodes, control/tool edges),
//!   structural validation and the stable topological order the executor
//!   relies on
//! - [`block`] / [`registry`] — the uniform block contract and the
//!   process-wide, read-only-after-startup block registry
//! - [`template`] — the `{{ … }}` expression renderer used by string
//!   settings
//! - [`context`] — the run-scoped capability bundle handed to blocks
//! - [`llm`] — the chat-model trait implemented by provider crates
//! - [`files`] — portable object-storage references
//!
//! Blocks never touch global state: everything they need (HTTP client,
//! object store, log sink, credentials, chat model) arrives through
//! [`context::RunContext`].

pub mod block;
pub mod context;
pub mod error;
pub mod files;
pub mod graph;
pub mod llm;
pub mod registry;
pub mod template;

pub use block::{Block, BlockInput, BlockKind, ToolSpec};
pub use context::RunContext;
pub use error::{BlockError, GraphError, TemplateError};
pub use graph::{Edge, EdgeKind, Graph, Node};
pub use registry::{BlockRegistry, BlockSpec};

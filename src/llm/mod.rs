//! Language-model integration.
//!
//! This module provides the Ollama adapter and the composer that decides
//! when a model rephrasing is worth asking for.

pub mod backend;
pub mod composer;

pub use backend::{GenerationBackend, OllamaBackend};
pub use composer::ResponseComposer;

//! scalescout-llm: Text-understanding service abstraction.
//!
//! The pipeline treats the model as an opaque prompt-in / text-out call
//! ([`backend::complete_text`]) and parses everything it returns through
//! [`parse`], which never fails hard.

pub mod backend;
pub mod factory;
pub mod parse;

pub use backend::{complete_text, LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use factory::{build_backend, BackendConfig, BackendKind};

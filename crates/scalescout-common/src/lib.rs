//! scalescout-common: Shared error type and HTTP plumbing used across all scalescout crates.

pub mod error;
pub mod sandbox;

pub use error::{Result, ScoutError};
pub use sandbox::SandboxClient;

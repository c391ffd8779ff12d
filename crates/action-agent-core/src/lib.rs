//! Core types for the action request agent.
//!
//! This crate provides the building blocks shared by the other crates:
//! - `ActionRequest` / `RequestType` - Parsed requests from the dispatch layer
//! - `ActionOutcome` - What a module produced
//! - `AgentConfig` - Spool directory and message timeout
//! - `Module` and `Connector` traits for the external collaborators

pub mod config;
pub mod outcome;
pub mod request;
pub mod traits;

pub use config::AgentConfig;
pub use outcome::ActionOutcome;
pub use request::{ActionRequest, RequestType};
pub use traits::{ConnectionError, Connector, JobId, Module, RequestError};

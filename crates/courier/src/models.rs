//! These models represent the objects passed around by the relay
//!
//! There are a few related formats we need to interact with:
//! - anthropic messages/tools, sent from the orchestrator to the LLM
//! - openai messages/tools, sent from the orchestrator to the LLM
//! - MCP tool descriptors and call results, fetched from the tool host
//!
//! These overlap but do not match exactly, so everything is converted into
//! the internal structs here as soon as it crosses a boundary.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;

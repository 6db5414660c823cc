//! LLM provider abstraction for research-rs
//!
//! Provider-agnostic access to the answering capability's transport. The
//! engine's agent adapter builds on these types:
//!
//! - Plain-text message types for conversation turns
//! - Completion request/response types with a builder
//! - The [`LLMProvider`] trait implemented per service
//! - Concrete Anthropic and OpenAI providers (behind feature flags)
//!
//! Tool use, if the capability performs any, is the capability's own
//! concern; completions surface only text, usage, and a stop reason.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "anthropic", feature = "openai"))]
pub mod providers;

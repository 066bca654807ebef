//! Chat-completion integration for Callsight.
//!
//! This crate provides a provider-agnostic abstraction over chat-completion
//! services. Each backend receives the same ordered [`ChatMessage`] list and
//! translates the `system` role according to its [`SystemRoleMapping`].
//!
//! # Providers
//! - **Anthropic**: Messages API (default)
//! - **Ollama**: Local `/api/chat` runtime
//!
//! # Example
//! ```no_run
//! use callsight_llm::{ChatMessage, CompletionRequest, LlmClient, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = CompletionRequest::new(
//!     "llama3.2",
//!     vec![ChatMessage::system("Analyze calls."), ChatMessage::user("Busiest hour?")],
//! );
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, LlmClient, TokenUsage,
};
pub use factory::create_client;
pub use providers::{AnthropicClient, OllamaClient};
pub use types::{AdaptedMessages, ProviderType, SystemRoleMapping};

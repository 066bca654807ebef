//! Provider selection and per-backend role mapping.

use crate::client::{ChatMessage, ChatRole};
use callsight_core::{AppError, AppResult};

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Anthropic,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Role mapping used when the config does not name one.
    pub fn default_role_mapping(&self) -> SystemRoleMapping {
        match self {
            Self::Anthropic => SystemRoleMapping::AsUser,
            Self::Ollama => SystemRoleMapping::Inline,
        }
    }

    /// Role mapping a backend uses for `systemRole: native`.
    pub fn native_role_mapping(&self) -> SystemRoleMapping {
        match self {
            Self::Anthropic => SystemRoleMapping::TopLevel,
            Self::Ollama => SystemRoleMapping::Inline,
        }
    }

    /// Resolve the configured `systemRole` value for this backend.
    pub fn role_mapping(&self, configured: Option<&str>) -> AppResult<SystemRoleMapping> {
        match configured.map(|s| s.to_lowercase()) {
            None => Ok(self.default_role_mapping()),
            Some(value) => match value.as_str() {
                "native" => Ok(self.native_role_mapping()),
                "user" => Ok(SystemRoleMapping::AsUser),
                other => Err(AppError::Config(format!(
                    "Unknown systemRole '{}' for {}. Supported: native, user",
                    other,
                    self.as_str()
                ))),
            },
        }
    }
}

/// How `system` messages are presented to a completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRoleMapping {
    /// Keep system messages in the list with role `system`
    Inline,
    /// Lift system content into a separate top-level field
    TopLevel,
    /// Re-label system messages as `user`, in place
    AsUser,
}

/// Messages after role mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedMessages {
    /// Top-level system text (only for `TopLevel`)
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl SystemRoleMapping {
    /// Apply the mapping to an ordered conversation.
    ///
    /// Non-system messages keep their relative order under every mapping.
    pub fn apply(&self, messages: &[ChatMessage]) -> AdaptedMessages {
        match self {
            Self::Inline => AdaptedMessages {
                system: None,
                messages: messages.to_vec(),
            },
            Self::AsUser => AdaptedMessages {
                system: None,
                messages: messages
                    .iter()
                    .map(|m| match m.role {
                        ChatRole::System => ChatMessage::user(m.content.clone()),
                        _ => m.clone(),
                    })
                    .collect(),
            },
            Self::TopLevel => {
                let system_parts: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == ChatRole::System)
                    .map(|m| m.content.as_str())
                    .collect();

                AdaptedMessages {
                    system: if system_parts.is_empty() {
                        None
                    } else {
                        Some(system_parts.join("\n\n"))
                    },
                    messages: messages
                        .iter()
                        .filter(|m| m.role != ChatRole::System)
                        .cloned()
                        .collect(),
                }
            }
        }
    }
}

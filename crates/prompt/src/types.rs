//! Prompt types for Callsight.

use serde::{Deserialize, Serialize};

/// A named system prompt loaded from YAML.
///
/// The template is rendered with Handlebars; `{{defaultPrompt}}` expands to
/// the built-in analytics prompt so a definition can extend it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// System prompt template with Handlebars syntax
    pub template: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: analytics.sms
title: SMS focus
apiVersion: "1.0"
createdBy: ops
template: |
  {{defaultPrompt}}
  Pay particular attention to SMS engagement.
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "analytics.sms");
        assert_eq!(def.created_by, "ops");
        assert!(def.description.is_none());
        assert!(def.template.contains("{{defaultPrompt}}"));
    }

    #[test]
    fn test_created_by_is_optional() {
        let yaml = "id: a\ntitle: A\napiVersion: \"1.0\"\ntemplate: hi\n";
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.created_by, "");
    }
}

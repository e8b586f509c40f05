//! Attribute definitions and their recorded values.
//!
//! A definition names one category of information worth remembering about
//! the user and carries the two prompts that drive it: a judgment prompt
//! (is this category relevant to the current input?) and an extraction
//! prompt (what, if anything, does the input reveal about it?). Values are
//! append-only observations; the newest value per definition wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One category of user information, with the prompts that operate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Store-assigned identifier. Zero until persisted.
    pub id: i64,
    /// Human-readable category name, e.g. "User Profile".
    pub name: String,
    /// Instructions handed to the extraction task.
    pub extraction_prompt: String,
    /// Yes/no question handed to the relevance judgment task.
    pub judgment_prompt: String,
}

impl AttributeDefinition {
    /// Creates an unpersisted definition, rejecting empty fields.
    pub fn new(
        name: impl Into<String>,
        extraction_prompt: impl Into<String>,
        judgment_prompt: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let extraction_prompt = extraction_prompt.into();
        let judgment_prompt = judgment_prompt.into();

        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if extraction_prompt.trim().is_empty() {
            return Err(ValidationError::EmptyExtractionPrompt);
        }
        if judgment_prompt.trim().is_empty() {
            return Err(ValidationError::EmptyJudgmentPrompt);
        }

        Ok(Self {
            id: 0,
            name,
            extraction_prompt,
            judgment_prompt,
        })
    }
}

/// One extracted observation for a definition.
///
/// Values are never overwritten by the pipeline; each extraction appends a
/// new row and readers pick the one with the highest `sequence_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Store-assigned, monotonically increasing identifier.
    pub sequence_id: i64,
    /// The definition this value belongs to.
    pub definition_id: i64,
    /// Extracted content, verbatim from the model (trimmed).
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttributeValue {
    /// Creates an unpersisted value, rejecting empty content.
    pub fn new(definition_id: i64, content: impl Into<String>) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        let now = Utc::now();
        Ok(Self {
            sequence_id: 0,
            definition_id,
            content,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_construction_validates_fields() {
        let def = AttributeDefinition::new(
            "User Profile",
            "Extract profile information.",
            "Is profile information needed?",
        )
        .unwrap();
        assert_eq!(def.id, 0);
        assert_eq!(def.name, "User Profile");

        assert_eq!(
            AttributeDefinition::new("", "e", "j").unwrap_err(),
            ValidationError::EmptyName
        );
        assert_eq!(
            AttributeDefinition::new("n", "   ", "j").unwrap_err(),
            ValidationError::EmptyExtractionPrompt
        );
        assert_eq!(
            AttributeDefinition::new("n", "e", "").unwrap_err(),
            ValidationError::EmptyJudgmentPrompt
        );
    }

    #[test]
    fn value_construction_validates_content() {
        let value = AttributeValue::new(3, "engineer").unwrap();
        assert_eq!(value.definition_id, 3);
        assert_eq!(value.created_at, value.updated_at);

        assert_eq!(
            AttributeValue::new(3, "  ").unwrap_err(),
            ValidationError::EmptyContent
        );
    }

    #[test]
    fn definition_round_trips_through_json() {
        let def = AttributeDefinition {
            id: 7,
            name: "Expertise & Skills".into(),
            extraction_prompt: "Extract skills.".into(),
            judgment_prompt: "Are skills relevant?".into(),
        };
        let json = serde_json::to_string(&def).unwrap();
        let back: AttributeDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}

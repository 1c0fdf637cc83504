// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the recipebox server and its HTTP clients.
//! This module defines the JSON bodies exchanged on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recipe record.
///
/// `id` and `published_at` are assigned by the durable store when the record
/// is created; clients leave them empty on create and update.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Recipe {
    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }

    /// Apply a partial update. Empty fields in `patch` leave the current value
    /// untouched; `id` and `published_at` never change.
    pub fn merge(&mut self, patch: Recipe) {
        if !patch.name.is_empty() {
            self.name = patch.name;
        }
        if !patch.tags.is_empty() {
            self.tags = patch.tags;
        }
        if !patch.ingredients.is_empty() {
            self.ingredients = patch.ingredients;
        }
        if !patch.instructions.is_empty() {
            self.instructions = patch.instructions;
        }
    }
}

/// Sign-in request body
#[derive(Serialize, Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Signed token handed out by sign-in and refresh
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenOutput {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Plain acknowledgement body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Body of every error response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_uses_camel_case_and_skips_empty_fields() {
        let recipe = Recipe {
            name: "Pancakes".to_string(),
            tags: vec!["breakfast".to_string()],
            ..Recipe::default()
        };
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Pancakes", "tags": ["breakfast"]}));

        let parsed: Recipe = serde_json::from_str(
            r#"{"id":"abc","name":"Soup","publishedAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id.as_deref(), Some("abc"));
        assert!(parsed.published_at.is_some());
    }

    #[test]
    fn tag_match_ignores_case() {
        let recipe = Recipe {
            tags: vec!["Italian".to_string(), "pasta".to_string()],
            ..Recipe::default()
        };
        assert!(recipe.has_tag("italian"));
        assert!(recipe.has_tag("PASTA"));
        assert!(!recipe.has_tag("soup"));
    }

    #[test]
    fn merge_keeps_identity_and_unset_fields() {
        let mut stored = Recipe {
            id: Some("r1".to_string()),
            name: "Old".to_string(),
            tags: vec!["a".to_string()],
            ingredients: vec!["flour".to_string()],
            instructions: vec!["mix".to_string()],
            published_at: Some(Utc::now()),
        };
        let published = stored.published_at;
        stored.merge(Recipe {
            id: Some("other".to_string()),
            name: "New".to_string(),
            ..Recipe::default()
        });
        assert_eq!(stored.id.as_deref(), Some("r1"));
        assert_eq!(stored.name, "New");
        assert_eq!(stored.tags, vec!["a".to_string()]);
        assert_eq!(stored.published_at, published);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}

//! Typed view of the story database document
//!
//! Chapters type the fields the migration writes and keep everything else in
//! their `fields` map. Stories are only read and trimmed, so they stay a plain
//! mapping behind accessors and keep their key layout.
//!
//! Every field tracks presence: `None` means the key is absent, while a key
//! that is present with a `null` value becomes `Some(Value::Null)`. The
//! defaulting rules only fire on absent keys.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The whole database document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub stories: Option<Vec<Story>>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub chapters: Option<Vec<Chapter>>,

    /// Other collections (users, comments, ...) that ride along unchanged
    #[serde(flatten)]
    pub collections: Map<String, Value>,
}

impl Document {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        // Every field is already a JSON value, so this can't fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn stories(&self) -> &[Story] {
        self.stories.as_deref().unwrap_or_default()
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.chapters.as_deref().unwrap_or_default()
    }
}

/// A story record, kept as its own mapping so that its key layout is written
/// back exactly as it was read. `chapters` holds the embedded list until it is
/// migrated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Story {
    fields: Map<String, Value>,
}

impl Story {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id")
    }

    pub fn created_at(&self) -> Option<&Value> {
        self.fields.get("createdAt")
    }

    /// Raw value, since a non-list `chapters` is left alone
    pub fn chapters(&self) -> Option<&Value> {
        self.fields.get("chapters")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// True while the story still embeds a chapter list.
    pub fn has_embedded_chapters(&self) -> bool {
        matches!(self.chapters(), Some(Value::Array(_)))
    }

    /// Removes and returns the embedded chapter list. A `chapters` field that
    /// isn't a list stays where it is and `None` is returned.
    pub fn take_embedded_chapters(&mut self) -> Option<Vec<Value>> {
        if !self.has_embedded_chapters() {
            return None;
        }
        match self.fields.shift_remove("chapters") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

/// A chapter record, either still embedded in a story or in the top-level
/// collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub story_id: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Value>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Chapter {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Deserializes a key that is present, keeping an explicit `null` as
/// `Some(Value::Null)`. Paired with `#[serde(default)]` so absent keys stay
/// `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

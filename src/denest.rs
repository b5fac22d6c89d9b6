//! Moves chapters embedded in stories into the top-level collection.
//!
//! # The Algorithm
//!
//! 1. Make sure the document has a top-level `chapters` list.
//! 2. For every story whose `chapters` field is a list, in document order:
//!    - stamp each chapter with the story's id as `storyId`
//!    - default a missing `order` to the chapter's 1-based position
//!    - default a missing `createdAt` to the story's `createdAt`, or to the
//!      configured fallback timestamp
//!    - append it unless a chapter with the same id is already present
//!    - drop the story's `chapters` field
//! 3. Stable sort of the top-level list by `(storyId, order)`.
//!
//! Stories whose `chapters` field is missing or isn't a list are left as they
//! are. A chapter whose id is already in the top-level list is silently
//! skipped, with no merge and no overwrite, which makes reruns harmless.
//!
//! Running the pass over its own output changes nothing: no story embeds
//! chapters any more and the list is already sorted.

use crate::error::{RecordRef, StructuralError};
use crate::model::{Chapter, Document};
use crate::ordering::{keys_equal, sort_chapters};
use crate::report::{display_id, MigrationReport, StoryReport};
use serde_json::Value;
use tracing::debug;

/// Timestamp given to chapters when neither they nor their story have one.
pub const DEFAULT_CREATED_AT: &str = "2024-01-01T00:00:00.000Z";

/// Output of a successful pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Denested {
    pub document: Document,
    pub report: MigrationReport,
}

/// The chapter denesting transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Denester {
    default_created_at: Value,
}

impl Denester {
    pub fn new() -> Self {
        Self::with_default_created_at(DEFAULT_CREATED_AT)
    }

    /// Use another fallback for chapters whose story has no `createdAt`.
    pub fn with_default_created_at(timestamp: impl Into<String>) -> Self {
        Self {
            default_created_at: Value::String(timestamp.into()),
        }
    }

    pub fn default_created_at(&self) -> &Value {
        &self.default_created_at
    }

    /// Runs the transform. The document is consumed so that a failed pass
    /// can't leave a half-migrated copy behind.
    pub fn denest(&self, mut document: Document) -> Result<Denested, StructuralError> {
        let chapters = document.chapters.get_or_insert_with(Vec::new);
        let mut report = MigrationReport::default();

        for (story_index, story) in document.stories.iter_mut().flatten().enumerate() {
            if !story.has_embedded_chapters() {
                continue;
            }
            let story_id = story
                .id()
                .cloned()
                .ok_or_else(|| StructuralError::missing(RecordRef::Story(story_index), "id"))?;
            let inherited_created_at = story
                .created_at()
                .cloned()
                .unwrap_or_else(|| self.default_created_at.clone());
            let embedded = story.take_embedded_chapters().unwrap_or_default();
            debug!(
                story = %display_id(&story_id),
                count = embedded.len(),
                "migrating embedded chapters"
            );

            let mut entry = StoryReport::new(story_id.clone(), embedded.len());
            for (position, raw) in embedded.into_iter().enumerate() {
                let record = RecordRef::EmbeddedChapter {
                    story: story_index,
                    chapter: position,
                };
                let mut chapter = Chapter::from_value(raw)
                    .map_err(|source| StructuralError::InvalidRecord { record, source })?;

                chapter.story_id = Some(story_id.clone());
                if chapter.order.is_none() {
                    chapter.order = Some(Value::from(position + 1));
                }
                if chapter.created_at.is_none() {
                    chapter.created_at = Some(inherited_created_at.clone());
                }

                let id = chapter
                    .id
                    .as_ref()
                    .ok_or_else(|| StructuralError::missing(record, "id"))?;
                if contains_chapter(chapters, id)? {
                    debug!(chapter = %display_id(id), "chapter already migrated, skipping");
                    entry.skipped += 1;
                } else {
                    chapters.push(chapter);
                    entry.appended += 1;
                }
            }
            report.stories.push(entry);
        }

        sort_chapters(chapters)?;
        report.total_chapters = chapters.len();
        Ok(Denested { document, report })
    }
}

impl Default for Denester {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the collection already holds a chapter with this id. Every
/// existing chapter must carry an id to be compared. Numeric ids match by
/// value, so `1`, `1.0` and `true` are the same id.
fn contains_chapter(chapters: &[Chapter], id: &Value) -> Result<bool, StructuralError> {
    for (index, existing) in chapters.iter().enumerate() {
        match &existing.id {
            Some(existing_id) if keys_equal(existing_id, id) => return Ok(true),
            Some(_) => {}
            None => return Err(StructuralError::missing(RecordRef::Chapter(index), "id")),
        }
    }
    Ok(false)
}

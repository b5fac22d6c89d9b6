//! What a migration run did, per story

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Counts for one story whose embedded chapters were migrated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryReport {
    pub story_id: Value,
    /// Chapters found embedded in the story
    pub embedded: usize,
    /// Chapters appended to the top-level collection
    pub appended: usize,
    /// Chapters dropped because their id was already present
    pub skipped: usize,
}

impl StoryReport {
    pub fn new(story_id: Value, embedded: usize) -> Self {
        Self {
            story_id,
            embedded,
            appended: 0,
            skipped: 0,
        }
    }
}

/// Summary of one denest pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    pub stories: Vec<StoryReport>,
    /// Size of the top-level chapter collection afterwards
    pub total_chapters: usize,
}

impl MigrationReport {
    pub fn appended(&self) -> usize {
        self.stories.iter().map(|s| s.appended).sum()
    }

    pub fn skipped(&self) -> usize {
        self.stories.iter().map(|s| s.skipped).sum()
    }

    /// True when nothing was left to migrate.
    pub fn is_noop(&self) -> bool {
        self.stories.is_empty()
    }
}

/// Renders an id the way a person would type it: strings without quotes.
pub(crate) fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stories.is_empty() {
            return writeln!(f, "No embedded chapters found.");
        }
        for story in &self.stories {
            write!(
                f,
                "Migrating {} chapters from story {}...",
                story.embedded,
                display_id(&story.story_id)
            )?;
            if story.skipped > 0 {
                write!(f, " ({} already present)", story.skipped)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

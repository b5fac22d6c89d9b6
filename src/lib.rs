//! # denest
//!
//! Moves chapter records embedded in story records of a story database
//! document into a top-level `chapters` collection. Each moved chapter gets a
//! `storyId` back-reference, an `order` and a `createdAt` timestamp, and the
//! collection ends up sorted by `(storyId, order)`.
//!
//! - [`model`]: typed records with explicit field presence
//! - [`denest`]: the transform itself
//! - [`store`]: loading and persisting the JSON document
//! - [`migration`]: load, transform, persist as one run

pub mod denest;
pub mod error;
pub mod migration;
pub mod model;
pub mod ordering;
pub mod report;
pub mod store;

pub use denest::{Denested, Denester, DEFAULT_CREATED_AT};
pub use error::{Error, ErrorKind, RecordRef, StructuralError};
pub use migration::{Migration, Mode, Outcome};
pub use model::{Chapter, Document, Story};
pub use report::{MigrationReport, StoryReport};
pub use store::{DocumentStore, JsonFileStore};

pub type Result<T> = std::result::Result<T, Error>;

//! One migration run: load, denest, persist.
//!
//! The first failure in any stage ends the run. The document is only handed
//! to the store once the transform has fully succeeded, so a structural error
//! never reaches disk.

use crate::denest::{Denested, Denester};
use crate::error::Error;
use crate::model::Document;
use crate::report::MigrationReport;
use crate::store::DocumentStore;
use tracing::info;

/// Whether a run writes its result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Apply,
    /// Transform and report, but leave the location untouched
    DryRun,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub document: Document,
    pub report: MigrationReport,
    pub persisted: bool,
}

/// Drives a [`Denester`] against a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct Migration<S> {
    store: S,
    denester: Denester,
    mode: Mode,
}

impl<S: DocumentStore> Migration<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            denester: Denester::new(),
            mode: Mode::Apply,
        }
    }

    pub fn with_denester(mut self, denester: Denester) -> Self {
        self.denester = denester;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run(&self) -> Result<Outcome, Error> {
        let document = self.store.load()?;
        let Denested { document, report } = self.denester.denest(document)?;
        info!(
            stories = report.stories.len(),
            appended = report.appended(),
            skipped = report.skipped(),
            "denested chapters"
        );

        let persisted = match self.mode {
            Mode::Apply => {
                self.store.persist(&document)?;
                true
            }
            Mode::DryRun => false,
        };
        Ok(Outcome {
            document,
            report,
            persisted,
        })
    }
}

//! Shared configuration loader for denest.
//!
//! `defaults/denest.default.toml` is embedded into the binary so that the
//! documented defaults and runtime behavior stay in sync. Callers layer a user
//! file, `DENEST_*` environment variables and CLI overrides on top of those
//! defaults via [`Loader`] before deserializing into [`DenestConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, ValueKind};
use denest::{Denester, JsonFileStore, Migration, Mode};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/denest.default.toml");

/// Top-level configuration consumed by the denest CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct DenestConfig {
    pub document: DocumentConfig,
    pub migration: MigrationConfig,
    pub report: ReportConfig,
}

/// Where the document lives and how it is written back.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    pub location: PathBuf,
    #[serde(default)]
    pub output: Option<PathBuf>,
    pub indent: usize,
    pub atomic_write: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    pub default_created_at: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    Text,
    Json,
}

impl DenestConfig {
    pub fn store(&self) -> JsonFileStore {
        let store = JsonFileStore::new(&self.document.location)
            .with_indent(self.document.indent)
            .with_atomic_write(self.document.atomic_write);
        match &self.document.output {
            Some(output) => store.with_output(output),
            None => store,
        }
    }

    pub fn denester(&self) -> Denester {
        Denester::with_default_created_at(self.migration.default_created_at.clone())
    }

    pub fn mode(&self) -> Mode {
        if self.migration.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }

    /// A ready-to-run migration wired from this configuration.
    pub fn migration(&self) -> Migration<JsonFileStore> {
        Migration::new(self.store())
            .with_denester(self.denester())
            .with_mode(self.mode())
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `DENEST_<SECTION>__<KEY>` variables from the process environment,
    /// e.g. `DENEST_DOCUMENT__LOCATION=/srv/db.json`.
    pub fn with_environment(self) -> Self {
        self.with_environment_source(None)
    }

    fn with_environment_source(mut self, vars: Option<config::Map<String, String>>) -> Self {
        let source = Environment::with_prefix("DENEST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<DenestConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<DenestConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.document.location, PathBuf::from("db.json"));
        assert_eq!(config.document.output, None);
        assert_eq!(config.document.indent, 2);
        assert!(config.document.atomic_write);
        assert_eq!(
            config.migration.default_created_at,
            denest::DEFAULT_CREATED_AT
        );
        assert_eq!(config.mode(), Mode::Apply);
        assert_eq!(config.report.format, ReportFormat::Text);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("document.location", "/tmp/story.json")
            .expect("override to apply")
            .set_override("migration.dry_run", true)
            .expect("override to apply")
            .set_override("report.format", "json")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.document.location, PathBuf::from("/tmp/story.json"));
        assert_eq!(config.mode(), Mode::DryRun);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.store().location(), Path::new("/tmp/story.json"));
    }

    #[test]
    fn user_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("denest.toml");
        fs::write(
            &path,
            "[document]\nlocation = \"stories.json\"\noutput = \"out.json\"\nindent = 4\n",
        )
        .unwrap();

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.document.location, PathBuf::from("stories.json"));
        assert_eq!(config.document.indent, 4);
        assert!(config.document.atomic_write);
        assert_eq!(config.store().target(), Path::new("out.json"));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Loader::new()
            .with_file(dir.path().join("absent.toml"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .expect("config to build");
        assert_eq!(config.document.location, PathBuf::from("db.json"));
    }

    #[test]
    fn environment_variables_override_defaults() {
        let mut vars = config::Map::new();
        vars.insert("DENEST_DOCUMENT__LOCATION".into(), "env.json".into());
        vars.insert(
            "DENEST_MIGRATION__DEFAULT_CREATED_AT".into(),
            "2000-01-01T00:00:00.000Z".into(),
        );

        let config = Loader::new()
            .with_environment_source(Some(vars))
            .build()
            .expect("config to build");
        assert_eq!(config.document.location, PathBuf::from("env.json"));
        assert_eq!(
            config.denester().default_created_at(),
            &serde_json::Value::String("2000-01-01T00:00:00.000Z".into())
        );
    }

    #[test]
    fn unknown_report_format_is_rejected() {
        let result = Loader::new()
            .set_override("report.format", "yaml")
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }
}

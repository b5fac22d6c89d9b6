//! Loading and persisting the whole document
//!
//! [`DocumentStore`] is the only I/O boundary of a migration. [`JsonFileStore`]
//! reads a JSON file and writes pretty-printed JSON back, by default through a
//! temporary file in the same directory that is renamed over the target, so a
//! failed write never leaves a truncated document behind.

use crate::error::{Error, StructuralError};
use crate::model::Document;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a document comes from and goes back to.
pub trait DocumentStore {
    fn load(&self) -> Result<Document, Error>;
    fn persist(&self, document: &Document) -> Result<(), Error>;
}

/// A JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    location: PathBuf,
    output: Option<PathBuf>,
    indent: usize,
    atomic: bool,
}

impl JsonFileStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            output: None,
            indent: 2,
            atomic: true,
        }
    }

    /// Persist somewhere else instead of overwriting the source.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_atomic_write(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Path written by [`DocumentStore::persist`].
    pub fn target(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.location)
    }

    /// Pretty-prints the document. Non-ASCII text is written as-is.
    pub fn render(&self, document: &Document) -> Result<Vec<u8>, serde_json::Error> {
        let indent = vec![b' '; self.indent];
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        document.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<Document, Error> {
        let path = &self.location;
        let bytes = fs::read(path).map_err(|source| Error::read(path, source))?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|source| Error::Malformed {
            path: path.clone(),
            source,
        })?;
        let document = Document::from_value(value).map_err(StructuralError::Layout)?;
        info!(path = %path.display(), stories = document.stories().len(), "loaded document");
        Ok(document)
    }

    fn persist(&self, document: &Document) -> Result<(), Error> {
        let path = self.target();
        let bytes = self
            .render(document)
            .map_err(|e| Error::write(path, e.into()))?;
        if self.atomic {
            atomic_write(path, &bytes)?;
        } else {
            fs::write(path, &bytes).map_err(|source| Error::write(path, source))?;
        }
        info!(path = %path.display(), bytes = bytes.len(), "persisted document");
        Ok(())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp =
        tempfile::NamedTempFile::new_in(dir).map_err(|source| Error::write(path, source))?;
    temp.write_all(data)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| Error::write(path, source))?;
    temp.persist(path).map_err(|e| Error::write(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn write_fixture(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("db.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), r#"{"stories": [{"id": "s1"}]}"#);
        let doc = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(doc.stories().len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFileStore::new(dir.path().join("nope.json"))
            .load()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().starts_with("cannot read "));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), r#"{"stories": ["#);
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn wrong_layout_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), r#"{"stories": 3}"#);
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn non_ascii_text_round_trips_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            r#"{"stories": [{"id": "s1", "title": "Truyện ngắn – 物語"}]}"#,
        );
        let store = JsonFileStore::new(&path);
        let doc = store.load().unwrap();
        store.persist(&doc).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Truyện ngắn – 物語"));
        assert!(!written.contains("\\u"));
        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn indent_width_is_configurable() {
        let store = JsonFileStore::new("unused.json").with_indent(4);
        let doc = Document::from_value(json!({"chapters": []})).unwrap();
        let rendered = String::from_utf8(store.render(&doc).unwrap()).unwrap();
        assert_eq!(rendered, "{\n    \"chapters\": []\n}\n");
    }

    #[test]
    fn output_path_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_fixture(dir.path(), r#"{"stories": []}"#);
        let output = dir.path().join("migrated.json");
        let store = JsonFileStore::new(&source).with_output(&output);

        let doc = Document::from_value(json!({"stories": [], "chapters": []})).unwrap();
        store.persist(&doc).unwrap();

        assert_eq!(fs::read_to_string(&source).unwrap(), r#"{"stories": []}"#);
        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, json!({"stories": [], "chapters": []}));
        assert_eq!(store.target(), output.as_path());
    }

    #[test]
    fn direct_write_when_atomic_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "{}");
        let store = JsonFileStore::new(&path).with_atomic_write(false);
        store.persist(&Document::default()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn unwritable_target_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("missing").join("db.json"));
        let err = store.persist(&Document::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}

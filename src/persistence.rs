//! Reading and writing identity files.
//!
//! An identity file is a JSON object mapping stable IDs to per-type lists of
//! identifier values. Output is deterministic: keys sorted, lists in
//! insertion order, fixed indentation, trailing newline. Repeated saves of an
//! unchanged partition are byte-identical.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::ParticipantsConfig;
use crate::errors::{ParticipantsError, Result};
use crate::resolution::{EventSink, IdentityResolver};
use crate::types::IdentityRecord;

/// Fails with `SamePath` if `load` and `save` name the same file.
///
/// Paths are compared literally and, where they resolve, after
/// canonicalization, so `./ids.json` and `ids.json` are caught too.
pub fn check_distinct_paths(load: &Path, save: &Path) -> Result<()> {
    let same = load == save
        || match (fs::canonicalize(load), canonical_target(save)) {
            (Ok(a), Some(b)) => a == b,
            _ => false,
        };

    if same {
        return Err(ParticipantsError::SamePath {
            path: save.display().to_string(),
        });
    }
    Ok(())
}

/// Canonical form of a path that may not exist yet.
fn canonical_target(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Some(canonical);
    }
    let file_name = path.file_name()?;
    fs::canonicalize(parent_dir(path))
        .ok()
        .map(|p| p.join(file_name))
}

/// Reads and parses an identity file.
pub fn read_record(path: &Path) -> Result<IdentityRecord> {
    let contents = fs::read_to_string(path).map_err(|e| ParticipantsError::File {
        message: format!("failed to read identity file: {}", e),
        path: path.display().to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|e| ParticipantsError::Parse {
        message: e.to_string(),
        path: path.display().to_string(),
        line: Some(e.line()),
    })
}

/// Renders `record` as pretty JSON indented by `indent` spaces per level.
pub fn render_record(record: &IdentityRecord, indent: usize) -> Result<String> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut serializer)?;
    buf.push(b'\n');

    String::from_utf8(buf).map_err(|e| ParticipantsError::invariant(e.to_string()))
}

/// Writes `record` to `path` atomically.
///
/// The output is staged in a uniquely named temporary file in the target's
/// directory and then renamed over `path`, so no other file is ever touched.
pub fn write_record(path: &Path, record: &IdentityRecord, indent: usize) -> Result<()> {
    let rendered = render_record(record, indent)?;
    let dir = parent_dir(path);

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| ParticipantsError::File {
        message: format!("failed to create temporary identity file: {}", e),
        path: dir.display().to_string(),
    })?;

    staged
        .write_all(rendered.as_bytes())
        .map_err(|e| ParticipantsError::File {
            message: format!("failed to write temporary identity file: {}", e),
            path: staged.path().display().to_string(),
        })?;

    staged.persist(path).map_err(|e| ParticipantsError::File {
        message: format!("failed to move temporary identity file into place: {}", e.error),
        path: path.display().to_string(),
    })?;

    Ok(())
}

/// Directory holding `path`, `.` for bare file names.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Loads a resolver from the identity file at `path`.
pub fn load(path: &Path, config: ParticipantsConfig) -> Result<IdentityResolver> {
    let record = read_record(path)?;
    tracing::info!(path = %path.display(), records = record.len(), "loading identities");
    IdentityResolver::from_record(record, config)
}

/// Loads a resolver from `path`, reporting later events to `sink`.
pub fn load_with_sink<S: EventSink>(
    path: &Path,
    config: ParticipantsConfig,
    sink: S,
) -> Result<IdentityResolver<S>> {
    let record = read_record(path)?;
    tracing::info!(path = %path.display(), records = record.len(), "loading identities");
    IdentityResolver::from_record_with_sink(record, config, sink)
}

/// Publishes unpublished persons and writes the partition to `path`.
pub fn save<S: EventSink>(resolver: &mut IdentityResolver<S>, path: &Path) -> Result<()> {
    let record = resolver.to_record()?;
    tracing::info!(path = %path.display(), records = record.len(), "saving identities");
    write_record(path, &record, resolver.config().indent)
}

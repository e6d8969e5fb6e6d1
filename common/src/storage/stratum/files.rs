//! Stratum directory layout: file naming, destroy, and repair.
//!
//! A stratum location is a directory holding a `STRATUM` marker file and
//! numbered segment logs (`000001.slog`, `000002.slog`, ...). Everything
//! else in the directory is foreign and never touched.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::log;

/// Marker file identifying a directory as a stratum location.
pub const MARKER_FILE: &str = "STRATUM";

/// Marker contents; carries the format version.
pub const MARKER_CONTENTS: &str = "stratum format 1\n";

const SEGMENT_SUFFIX: &str = ".slog";

/// File name of segment `id`.
pub fn segment_file_name(id: u64) -> String {
    format!("{id:06}{SEGMENT_SUFFIX}")
}

/// Parses a segment id out of a file name, or `None` for foreign files.
pub fn parse_segment_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(SEGMENT_SUFFIX)?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Returns true if the directory carries the stratum marker.
pub fn is_stratum_dir(dir: &Path) -> bool {
    dir.join(MARKER_FILE).is_file()
}

/// Writes (or rewrites) the marker file.
pub fn write_marker(dir: &Path) -> Result<()> {
    std::fs::write(dir.join(MARKER_FILE), MARKER_CONTENTS).map_err(|e| {
        Error::engine(format!("write marker in {}: {}", dir.display(), e))
    })
}

/// Lists segment files in ascending id order.
pub fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut segments = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(id) = parse_segment_file_name(name) {
            segments.push((id, entry.path()));
        }
    }
    segments.sort_by_key(|(id, _)| *id);
    Ok(segments)
}

/// Removes the stratum files at `location`, leaving foreign files alone.
///
/// A missing directory, or a directory without stratum files, is not an
/// error. The directory itself is removed only if it ends up empty.
pub async fn destroy(location: impl AsRef<Path>) -> Result<()> {
    let dir = location.as_ref();
    if !dir.is_dir() {
        return Ok(());
    }

    for (_, path) in list_segments(dir)? {
        std::fs::remove_file(&path)?;
    }
    let marker = dir.join(MARKER_FILE);
    if marker.is_file() {
        std::fs::remove_file(&marker)?;
    }

    // Leave the directory in place when foreign files remain.
    let _ = std::fs::remove_dir(dir);
    tracing::debug!(location = %dir.display(), "destroyed stratum location");
    Ok(())
}

/// Repairs the stratum location at `location`.
///
/// Each segment is scanned and truncated to its valid prefix, dropping any
/// torn tail left by a crash mid-append; a missing marker is restored. A
/// missing directory is not an error and nothing is created for it.
pub async fn repair(location: impl AsRef<Path>) -> Result<()> {
    let dir = location.as_ref();
    if !dir.is_dir() {
        return Ok(());
    }

    let segments = list_segments(dir)?;
    let had_stratum_files = !segments.is_empty() || is_stratum_dir(dir);

    for (id, path) in segments {
        let outcome = log::scan(&path)?;
        if outcome.truncated_tail {
            tracing::warn!(
                segment = id,
                valid_len = outcome.valid_len,
                "truncating torn segment tail"
            );
            let file = std::fs::OpenOptions::new().write(true).open(&path)?;
            file.set_len(outcome.valid_len)?;
            file.sync_all()?;
        }
    }

    if had_stratum_files && !is_stratum_dir(dir) {
        write_marker(dir)?;
    }
    Ok(())
}

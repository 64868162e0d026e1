//! Writing rendered topics and the output manifest to disk.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::markdown::{render, RenderOptions};
use crate::config::{FALLBACK_FILENAME, FILENAME_MAX_CHARS, MANIFEST_FILENAME};
use crate::error::Result;
use crate::normalize::strip_diacritics;
use crate::types::{CanonicalKey, TopicRecord};

/// Characters that are unsafe in file names on common filesystems.
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Derive a file name stem from a display title.
///
/// Strips diacritics, path-unsafe and control characters, trims, and
/// truncates to [`FILENAME_MAX_CHARS`] characters. Falls back to
/// [`FALLBACK_FILENAME`] when nothing is left.
///
/// # Examples
/// ```
/// use tafseer_harvester::render::sanitize_filename;
///
/// assert_eq!(sanitize_filename("مُنَاسَبَةُ الآيَةِ: لِمَا قَبْلَهَا"), "مناسبة الآية لما قبلها");
/// assert_eq!(sanitize_filename(" ?/ "), "قسم");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = strip_diacritics(title)
        .chars()
        .filter(|c| !UNSAFE_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let truncated: String = cleaned.trim().chars().take(FILENAME_MAX_CHARS).collect();
    let name = truncated.trim();

    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

/// Hands out unique `.md` file names.
///
/// A stem seen before gets a ` (2)`, ` (3)`, ... suffix.
#[derive(Debug, Default)]
pub struct FileNamer {
    taken: HashSet<String>,
}

impl FileNamer {
    /// Create a namer with no names taken.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a file name for a display title.
    pub fn name_for(&mut self, title: &str) -> String {
        let stem = sanitize_filename(title);
        let mut candidate = format!("{stem}.md");
        let mut counter = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{stem} ({counter}).md");
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Write a file atomically.
///
/// Writes to a hidden temp file, syncs to disk, then renames over the target,
/// so a crash never leaves a partial document behind.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = dir.join(format!(".{file_name}.tmp"));

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&temp_file, path)?;
    Ok(())
}

/// One topic as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestTopic {
    pub title: String,
    pub key: CanonicalKey,
    pub file: String,
    pub entries: usize,
    pub footnotes: u32,
}

/// Index of every document written in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub generated_at: String,
    pub topic_count: usize,
    pub topics: Vec<ManifestTopic>,
}

impl Manifest {
    /// Serialize as a YAML document.
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml_ng::to_string(self)?;
        Ok(format!("---\n{yaml}"))
    }
}

/// Render every topic into `output_dir` and write the manifest next to them.
///
/// The directory is created if needed. Topics are written in the order
/// given; that order also decides who gets the unsuffixed name when two
/// titles sanitize to the same file name.
pub fn save_topics<'a>(
    topics: impl IntoIterator<Item = &'a TopicRecord>,
    options: &RenderOptions,
    output_dir: &Path,
) -> Result<Manifest> {
    fs::create_dir_all(output_dir)?;

    let mut namer = FileNamer::new();
    let mut listed = Vec::new();

    for topic in topics {
        let rendered = render(topic, options);
        let listing = ManifestTopic {
            title: topic.display_title.clone(),
            key: topic.key.clone(),
            file: namer.name_for(&topic.display_title),
            entries: topic.entries.len(),
            footnotes: rendered.footnote_count,
        };

        write_atomic(&topic_path(output_dir, &listing), &rendered.text)?;
        tracing::debug!(file = %listing.file, entries = listing.entries, "Wrote topic");
        listed.push(listing);
    }

    let manifest = Manifest {
        generated_at: chrono::Local::now().to_rfc3339(),
        topic_count: listed.len(),
        topics: listed,
    };
    write_atomic(&output_dir.join(MANIFEST_FILENAME), &manifest.to_yaml()?)?;

    Ok(manifest)
}

/// Path of a manifest entry's document.
#[must_use]
pub fn topic_path(output_dir: &Path, topic: &ManifestTopic) -> PathBuf {
    output_dir.join(&topic.file)
}

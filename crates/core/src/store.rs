//! Durable storage for test outcomes
//!
//! One pretty-printed JSON file per outcome, named `*.outcome.json` so other
//! JSON files sharing the directory (reports, for one) are left alone.
//! Files are written to a temporary name in the target directory and renamed
//! into place, so a reader scanning the directory never sees a half-written
//! artifact under its final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use annalist_common::{Error, Result, TestOutcome};

const ARTIFACT_SUFFIX: &str = ".outcome.json";
const MAX_SLUG_LEN: usize = 60;

/// Reads and writes outcome artifacts in one directory
#[derive(Debug, Clone)]
pub struct OutcomeStore {
    dir: PathBuf,
}

impl OutcomeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an outcome, returning the artifact path
    pub fn write(&self, outcome: &TestOutcome) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(Self::artifact_name(outcome));
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut file, outcome)?;
        file.flush()?;
        file.persist(&path).map_err(|e| Error::Io(e.error))?;

        debug!("Outcome '{}' written to {}", outcome.title, path.display());
        Ok(path)
    }

    /// Load one artifact. Anything unreadable counts as corrupt.
    pub fn read(path: &Path) -> Result<TestOutcome> {
        let corrupt = |reason: String| Error::CorruptArtifact {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))
    }

    /// Whether `path` looks like an outcome artifact
    pub fn is_artifact(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| {
                !n.starts_with('.') && n.len() > ARTIFACT_SUFFIX.len() && n.ends_with(ARTIFACT_SUFFIX)
            })
            .unwrap_or(false)
    }

    /// `<story>--<title>--<write stamp>-<uuid>.outcome.json`.
    ///
    /// Reruns never overwrite each other, and for one story and title a later
    /// write sorts after an earlier one.
    pub fn artifact_name(outcome: &TestOutcome) -> String {
        format!(
            "{}--{}--{}-{}{}",
            slug(&outcome.story.id),
            slug(&outcome.title),
            Utc::now().format("%Y%m%dT%H%M%S%f"),
            Uuid::new_v4().simple(),
            ARTIFACT_SUFFIX
        )
    }
}

fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = match slug.char_indices().nth(MAX_SLUG_LEN) {
        Some((end, _)) => slug[..end].trim_end_matches('-'),
        None => slug,
    };

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

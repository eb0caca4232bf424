use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::index::VacancyIndex;

pub const INDEX_FILE: &str = "vacancy_index.json";
/// Plain-text RFC 3339 timestamp of the last successful training pass.
pub const MARKER_FILE: &str = "trained_at";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Atomic rename failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// On-disk home of the trained index and its timestamp marker.
///
/// Every write goes to a temp file in the same directory and is renamed into
/// place, so readers only ever see a complete artifact or the previous one.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the index, then the marker. Blocking.
    pub fn save(&self, index: &VacancyIndex) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;

        self.write_atomic(INDEX_FILE, |w| Ok(serde_json::to_writer(w, index)?))?;
        let marker = index.trained_at().to_rfc3339();
        self.write_atomic(MARKER_FILE, |w| Ok(w.write_all(marker.as_bytes())?))?;

        info!(
            dir = %self.dir.display(),
            generation = %index.generation(),
            "Persisted model artifacts"
        );
        Ok(())
    }

    /// Reads the persisted index. Blocking.
    pub fn load(&self) -> Result<VacancyIndex, PersistenceError> {
        let bytes = fs::read(self.dir.join(INDEX_FILE))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Training time recorded by the marker; `None` when it is missing or unreadable.
    pub async fn trained_at(&self) -> Option<DateTime<Utc>> {
        let raw = tokio::fs::read_to_string(self.dir.join(MARKER_FILE)).await.ok()?;
        parse_marker(&raw)
    }

    fn write_atomic<F>(&self, name: &str, write: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<(), PersistenceError>,
    {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(&mut tmp);
            write(&mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(name))?;
        Ok(())
    }
}

fn parse_marker(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::posting::Posting;
    use crate::skills::SkillNormalizer;

    fn sample_index() -> VacancyIndex {
        let normalizer = SkillNormalizer::default();
        let postings = [
            "html, css, javascript",
            "python, machine learning",
            "sql, python",
            "go, docker, kubernetes",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| Posting::from_raw(i as i64 + 1, t.to_string(), &normalizer))
        .collect();
        VacancyIndex::build(postings, 10, &normalizer)
    }

    #[test]
    fn test_round_trip_preserves_query_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let index = sample_index();
        store.save(&index).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.generation(), index.generation());
        assert_eq!(loaded.trained_at(), index.trained_at());

        let query: BTreeSet<String> = ["python", "sql"].map(str::to_string).into();
        let before: Vec<(i64, f64)> = index
            .query(&query, 4)
            .iter()
            .map(|s| (s.posting.id(), s.similarity_score))
            .collect();
        let after: Vec<(i64, f64)> = loaded
            .query(&query, 4)
            .iter()
            .map(|s| (s.posting.id(), s.similarity_score))
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_marker_matches_trained_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let index = sample_index();
        store.save(&index).unwrap();
        assert_eq!(store.trained_at().await, Some(index.trained_at()));
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_marker_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert_eq!(store.trained_at().await, None);

        std::fs::write(dir.path().join(MARKER_FILE), "yesterday-ish").unwrap();
        assert_eq!(store.trained_at().await, None);
    }

    #[test]
    fn test_corrupt_index_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"{\"generation\": 1").unwrap();
        let store = ModelStore::new(dir.path());
        assert!(matches!(store.load(), Err(PersistenceError::Serde(_))));
    }

    #[test]
    fn test_save_creates_directory_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("models").join("current");
        let store = ModelStore::new(&nested);
        store.save(&sample_index()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![MARKER_FILE, INDEX_FILE]);
    }

    #[test]
    fn test_parse_marker_accepts_offsets() {
        let parsed = parse_marker("2024-05-01T12:00:00+05:00\n").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T07:00:00+00:00");
    }
}

//! Local draft cache for the note editor.
//!
//! Maps a note id to its latest unsaved content. Writes are last-writer-wins
//! with no merging of concurrent edits. The cache can be backed by a JSON
//! file; [`DraftStore::flush`] rewrites it through a temp file and a rename
//! so a crash mid-write never leaves a truncated file behind. Flushes are
//! serialized, so the file always ends up holding the newest snapshot.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DraftStore {
    drafts: RwLock<HashMap<String, Draft>>,
    path: Option<PathBuf>,
    /// Held across snapshot, write, and rename.
    flush_lock: Mutex<()>,
}

impl DraftStore {
    /// An in-memory store; [`flush`](Self::flush) is a no-op.
    pub fn new() -> Self {
        Self {
            drafts: RwLock::new(HashMap::new()),
            path: None,
            flush_lock: Mutex::new(()),
        }
    }

    /// Open a file-backed store, loading existing drafts if the file exists.
    pub fn open(path: &Path) -> Result<Self> {
        let drafts = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read drafts file: {}", path.display()))?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse drafts file: {}", path.display()))?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            drafts: RwLock::new(drafts),
            path: Some(path.to_path_buf()),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self, id: &str, content: &str) -> Draft {
        self.save_at(id, content, Utc::now())
    }

    /// Store `content` for `id`, replacing any previous draft.
    pub fn save_at(&self, id: &str, content: &str, now: DateTime<Utc>) -> Draft {
        let draft = Draft {
            content: content.to_string(),
            saved_at: now,
        };
        self.drafts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), draft.clone());
        draft
    }

    pub fn load(&self, id: &str) -> Option<Draft> {
        self.drafts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Remove the draft for `id`. Returns whether one existed.
    pub fn discard(&self, id: &str) -> bool {
        self.drafts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// All drafts, most recently saved first.
    pub fn list(&self) -> Vec<(String, Draft)> {
        let mut all: Vec<(String, Draft)> = self
            .drafts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();
        all.sort_by(|a, b| b.1.saved_at.cmp(&a.1.saved_at).then_with(|| a.0.cmp(&b.0)));
        all
    }

    pub fn len(&self) -> usize {
        self.drafts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write all drafts to the backing file.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: BTreeMap<String, Draft> = self
            .drafts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create drafts directory: {}", parent.display()))?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write drafts file: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace drafts file: {}", path.display()))?;
        Ok(())
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_last_writer_wins() {
        let store = DraftStore::new();
        store.save_at("n1", "first", t0());
        store.save_at("n1", "second", t0() + Duration::seconds(1));

        let d = store.load("n1").unwrap();
        assert_eq!(d.content, "second");
        assert_eq!(d.saved_at, t0() + Duration::seconds(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_discard() {
        let store = DraftStore::new();
        store.save("n1", "x");
        assert!(store.discard("n1"));
        assert!(!store.discard("n1"));
        assert!(store.load("n1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let store = DraftStore::new();
        store.save_at("a", "old", t0());
        store.save_at("b", "new", t0() + Duration::minutes(5));
        let ids: Vec<String> = store.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("drafts.json");

        let store = DraftStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.save_at("note-1", "- [ ] Buy milk", t0());
        store.flush().unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = DraftStore::open(&path).unwrap();
        assert_eq!(reopened.load("note-1"), store.load("note-1"));
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drafts.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = DraftStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse drafts file"));
    }

    #[test]
    fn test_concurrent_flushes_keep_newest_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drafts.json");
        let store = DraftStore::open(&path).unwrap();

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..50 {
                        store.save(&format!("note-{}", writer), &format!("round {}", round));
                        store.flush().unwrap();
                    }
                });
            }
        });

        assert!(!path.with_extension("json.tmp").exists());
        let reopened = DraftStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 8);
        for writer in 0..8 {
            let id = format!("note-{}", writer);
            assert_eq!(reopened.load(&id).unwrap().content, "round 49");
        }
    }

    #[test]
    fn test_flush_without_path_is_noop() {
        let store = DraftStore::new();
        store.save("n", "x");
        store.flush().unwrap();
        assert!(store.path().is_none());
    }
}

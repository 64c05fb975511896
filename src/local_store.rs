use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::models::IssueReport;

pub const ISSUE_REPORTS_KEY: &str = "videoIssueReports";
pub const SEEN_NOTIFICATIONS_KEY: &str = "seenNotifications";

/// Key → JSON blob store, optionally mirrored to a file after every write
#[derive(Debug, Clone)]
pub struct LocalStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            path: None,
        }
    }

    /// Load the store from `path`; a missing file starts an empty store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => serde_json::from_str(&content)?,
            Ok(_) => HashMap::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), keys = entries.len(), "Local store opened");

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Missing keys read as an empty list
    pub async fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(blob) => Ok(serde_json::from_str(blob)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn set_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let blob = serde_json::to_string(items)?;
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), blob);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    /// Read-modify-write a list while holding the write lock. Memory only
    /// changes once the file write succeeded.
    pub async fn update_list<T, F>(&self, key: &str, update: F) -> Result<Vec<T>, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>),
    {
        let mut entries = self.entries.write().await;
        let mut items: Vec<T> = match entries.get(key) {
            Some(blob) => serde_json::from_str(blob)?,
            None => Vec::new(),
        };

        update(&mut items);

        let mut next = entries.clone();
        next.insert(key.to_string(), serde_json::to_string(&items)?);
        self.persist(&next).await?;
        *entries = next;
        Ok(items)
    }

    pub async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(false);
        }

        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next).await?;
        *entries = next;
        Ok(true)
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(path, content).await?;
        debug!(path = %path.display(), keys = entries.len(), "Local store persisted");
        Ok(())
    }
}

/// Append-only log of user reports about videos that did not play
#[derive(Debug, Clone)]
pub struct ReportLog {
    store: LocalStore,
}

impl ReportLog {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub async fn append(&self, report: IssueReport) -> Result<usize, StoreError> {
        let reports = self
            .store
            .update_list(ISSUE_REPORTS_KEY, |reports: &mut Vec<IssueReport>| reports.push(report))
            .await?;
        Ok(reports.len())
    }

    pub async fn all(&self) -> Result<Vec<IssueReport>, StoreError> {
        self.store.get_list(ISSUE_REPORTS_KEY).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(ISSUE_REPORTS_KEY).await.map(|_| ())
    }

    /// Ids of every reported video, whatever the issue type.
    /// An unreadable log counts as empty.
    pub async fn problematic_ids(&self) -> HashSet<String> {
        match self.all().await {
            Ok(reports) => reports.into_iter().map(|r| r.video_id).collect(),
            Err(e) => {
                warn!(error = %e, "Issue report log unreadable, treating as empty");
                HashSet::new()
            }
        }
    }

    pub async fn by_issue_type(&self) -> Result<BTreeMap<String, usize>, StoreError> {
        let mut counts = BTreeMap::new();
        for report in self.all().await? {
            *counts.entry(report.issue_type).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// "Already seen" flags for one-off notices
#[derive(Debug, Clone)]
pub struct NotificationFlags {
    store: LocalStore,
}

impl NotificationFlags {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub async fn has_seen(&self, key: &str) -> bool {
        self.store
            .get_list::<String>(SEEN_NOTIFICATIONS_KEY)
            .await
            .map(|seen| seen.iter().any(|k| k == key))
            .unwrap_or(false)
    }

    /// Returns true when the flag was not set before
    pub async fn mark_seen(&self, key: &str) -> Result<bool, StoreError> {
        let mut newly_seen = false;
        self.store
            .update_list(SEEN_NOTIFICATIONS_KEY, |seen: &mut Vec<String>| {
                if !seen.iter().any(|k| k == key) {
                    seen.push(key.to_string());
                    newly_seen = true;
                }
            })
            .await?;
        Ok(newly_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn report(video_id: &str, issue_type: &str) -> IssueReport {
        IssueReport {
            video_id: video_id.to_string(),
            issue_type: issue_type.to_string(),
            timestamp: Utc::now(),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_report_log_is_append_only_without_dedup() {
        let log = ReportLog::new(LocalStore::in_memory());
        log.append(report("gt9_mat_1", "unavailable")).await.unwrap();
        log.append(report("gt9_mat_1", "unavailable")).await.unwrap();
        log.append(report("R088uR4N6lY", "Vídeo trava no início")).await.unwrap();

        assert_eq!(log.all().await.unwrap().len(), 3);

        let ids = log.problematic_ids().await;
        assert!(ids.contains("gt9_mat_1"));
        assert!(ids.contains("R088uR4N6lY"));

        let counts = log.by_issue_type().await.unwrap();
        assert_eq!(counts.get("unavailable"), Some(&2));

        log.clear().await.unwrap();
        assert!(log.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        ReportLog::new(store.clone()).append(report("v1", "private")).await.unwrap();
        assert!(NotificationFlags::new(store).mark_seen("welcome").await.unwrap());

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(ReportLog::new(reopened.clone()).all().await.unwrap().len(), 1);

        let flags = NotificationFlags::new(reopened);
        assert!(flags.has_seen("welcome").await);
        assert!(!flags.mark_seen("welcome").await.unwrap());
        assert!(!flags.has_seen("other").await);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        let log = ReportLog::new(store.clone());
        log.append(report("v1", "private")).await.unwrap();

        // A directory in place of the file makes every write fail
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        assert!(log.append(report("v2", "unavailable")).await.is_err());
        assert!(log.clear().await.is_err());

        let reports = log.all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].video_id, "v1");
    }

    #[tokio::test]
    async fn test_corrupted_log_reads_as_no_problematic_ids() {
        let store = LocalStore::in_memory();
        store.entries.write().await.insert(ISSUE_REPORTS_KEY.to_string(), "not json".to_string());

        let log = ReportLog::new(store);
        assert!(log.all().await.is_err());
        assert!(log.problematic_ids().await.is_empty());
    }
}

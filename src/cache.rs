/// Local per-video cache of transcripts, summaries and chat history
use crate::config::CacheConfig;
use crate::llm::ChatMessage;
use crate::transcript::Transcript;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CACHE_FILE: &str = "video_cache.json";

/// Cached data for one video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// First store, milliseconds since the epoch
    pub cached_at: i64,
    /// Last read or write, milliseconds since the epoch
    pub last_accessed: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheDocument {
    #[serde(default)]
    videos: HashMap<String, CachedVideo>,
    #[serde(default)]
    chat_history: HashMap<String, Vec<ChatMessage>>,
}

impl CacheDocument {
    /// Current time, kept strictly after every recorded access so LRU order is total
    fn access_time(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let latest = self.videos.values().map(|v| v.last_accessed).max().unwrap_or(i64::MIN);
        now.max(latest.saturating_add(1))
    }

    fn upsert(&mut self, video_id: &str) -> &mut CachedVideo {
        let now = self.access_time();
        let entry = self.videos.entry(video_id.to_string()).or_insert(CachedVideo {
            transcript: None,
            summary: None,
            cached_at: now,
            last_accessed: now,
        });
        entry.last_accessed = now;
        entry
    }

    /// Drop least-recently-accessed videos beyond `max_entries`
    fn evict(&mut self, max_entries: usize) -> Vec<String> {
        if self.videos.len() <= max_entries {
            return Vec::new();
        }

        let mut by_access: Vec<(String, i64)> = self
            .videos
            .iter()
            .map(|(id, v)| (id.clone(), v.last_accessed))
            .collect();
        by_access.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let excess = self.videos.len() - max_entries;
        let evicted: Vec<String> = by_access.into_iter().take(excess).map(|(id, _)| id).collect();
        for id in &evicted {
            self.videos.remove(id);
            self.chat_history.remove(id);
        }
        evicted
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub video_count: usize,
    pub chat_count: usize,
    pub total_bytes: u64,
    pub size_human: String,
}

/// One row of `VideoCache::list`
#[derive(Debug, Clone, Serialize)]
pub struct CacheListing {
    pub video_id: String,
    pub has_transcript: bool,
    pub has_summary: bool,
    pub segment_count: usize,
    pub cached_at: i64,
    pub last_accessed: i64,
}

/// JSON-file cache keyed by video id with least-recently-accessed eviction.
///
/// Every operation reads the whole document, changes it and writes it back;
/// concurrent writers are last-write-wins.
#[derive(Debug, Clone)]
pub struct VideoCache {
    cache_dir: PathBuf,
    max_entries: usize,
}

impl VideoCache {
    pub fn new(cache_dir: PathBuf, max_entries: usize) -> Self {
        Self {
            cache_dir,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.cache_dir.clone(), config.max_entries)
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    async fn load(&self) -> CacheDocument {
        let path = self.path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<CacheDocument>(&content) {
                Ok(document) => document,
                Err(e) => {
                    warn!("⚠️ Ignoring unreadable cache {}: {}", path.display(), e);
                    CacheDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheDocument::default(),
            Err(e) => {
                warn!("⚠️ Failed to read cache {}: {}", path.display(), e);
                CacheDocument::default()
            }
        }
    }

    async fn save(&self, document: &CacheDocument) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let json_content = serde_json::to_string_pretty(document)?;
        tokio::fs::write(self.path(), json_content).await?;
        Ok(())
    }

    /// Cached entry for `video_id`, refreshing its access time
    pub async fn get(&self, video_id: &str) -> Result<Option<CachedVideo>> {
        let mut document = self.load().await;
        let now = document.access_time();

        let entry = match document.videos.get_mut(video_id) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.clone()
            }
            None => {
                debug!("Cache miss for {}", video_id);
                return Ok(None);
            }
        };

        self.save(&document).await?;
        debug!("Cache hit for {}", video_id);
        Ok(Some(entry))
    }

    pub async fn store_transcript(&self, video_id: &str, transcript: &Transcript) -> Result<()> {
        let mut document = self.load().await;
        document.upsert(video_id).transcript = Some(transcript.clone());
        self.finish_store(&mut document, video_id, "transcript").await
    }

    pub async fn store_summary(&self, video_id: &str, summary: &str) -> Result<()> {
        let mut document = self.load().await;
        document.upsert(video_id).summary = Some(summary.to_string());
        self.finish_store(&mut document, video_id, "summary").await
    }

    async fn finish_store(&self, document: &mut CacheDocument, video_id: &str, what: &str) -> Result<()> {
        let evicted = document.evict(self.max_entries);
        if !evicted.is_empty() {
            info!("🧹 Evicted {} cached video(s): {}", evicted.len(), evicted.join(", "));
        }
        self.save(document).await?;
        info!("💾 Cached {} for {}", what, video_id);
        Ok(())
    }

    /// Remove one video and its chat; `false` if it was not cached
    pub async fn remove(&self, video_id: &str) -> Result<bool> {
        let mut document = self.load().await;
        let removed = document.videos.remove(video_id).is_some();
        let chat_removed = document.chat_history.remove(video_id).is_some();
        if removed || chat_removed {
            self.save(&document).await?;
        }
        Ok(removed)
    }

    /// Remove every cached video, keeping chat histories
    pub async fn clear(&self) -> Result<usize> {
        let mut document = self.load().await;
        let count = document.videos.len();
        document.videos.clear();
        self.save(&document).await?;
        info!("🗑️ Cleared {} cached video(s)", count);
        Ok(count)
    }

    /// Remove the whole cache document
    pub async fn clear_all(&self) -> Result<()> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => {
                info!("🗑️ Removed cache file {}", self.path().display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let document = self.load().await;
        let total_bytes = match tokio::fs::metadata(self.path()).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };

        Ok(CacheStats {
            video_count: document.videos.len(),
            chat_count: document.chat_history.len(),
            total_bytes,
            size_human: format_bytes(total_bytes),
        })
    }

    /// Cached videos, most recently accessed first
    pub async fn list(&self) -> Result<Vec<CacheListing>> {
        let document = self.load().await;
        let mut listings: Vec<CacheListing> = document
            .videos
            .into_iter()
            .map(|(video_id, video)| CacheListing {
                has_transcript: video.transcript.is_some(),
                has_summary: video.summary.is_some(),
                segment_count: video.transcript.as_ref().map(|t| t.len()).unwrap_or(0),
                cached_at: video.cached_at,
                last_accessed: video.last_accessed,
                video_id,
            })
            .collect();
        listings.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed).then_with(|| a.video_id.cmp(&b.video_id)));
        Ok(listings)
    }

    pub async fn chat_history(&self, video_id: &str) -> Result<Vec<ChatMessage>> {
        let document = self.load().await;
        Ok(document.chat_history.get(video_id).cloned().unwrap_or_default())
    }

    pub async fn save_chat_history(&self, video_id: &str, history: &[ChatMessage]) -> Result<()> {
        let mut document = self.load().await;
        document.chat_history.insert(video_id.to_string(), history.to_vec());
        self.save(&document).await
    }

    /// Drop every stored chat history
    pub async fn clear_chat_history(&self) -> Result<usize> {
        let mut document = self.load().await;
        let count = document.chat_history.len();
        document.chat_history.clear();
        self.save(&document).await?;
        info!("🗑️ Cleared {} chat histor{}", count, if count == 1 { "y" } else { "ies" });
        Ok(count)
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

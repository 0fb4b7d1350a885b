use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::nocodb::{VideoPage, VideoQuery};

/// Short-lived cache of upstream pages keyed by the exact query sent to
/// NocoDB. A TTL of zero disables it.
pub struct PageCache {
    entries: Mutex<HashMap<VideoQuery, CachedPage>>,
    ttl: Duration,
    max_entries: usize,
}

struct CachedPage {
    page: VideoPage,
    stored_at: DateTime<Utc>,
}

impl PageCache {
    pub fn new(ttl_seconds: u64, max_entries: usize) -> Self {
        let ttl_seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::try_seconds(ttl_seconds).unwrap_or(Duration::MAX),
            max_entries,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl > Duration::zero() && self.max_entries > 0
    }

    pub async fn get(&self, query: &VideoQuery, now: DateTime<Utc>) -> Option<VideoPage> {
        if !self.is_enabled() {
            return None;
        }

        let mut entries = self.entries.lock().await;
        prune_expired(&mut entries, self.ttl, now);
        entries.get(query).map(|cached| cached.page.clone())
    }

    pub async fn insert(&self, query: VideoQuery, page: VideoPage, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }

        let mut entries = self.entries.lock().await;
        prune_expired(&mut entries, self.ttl, now);
        entries.insert(
            query,
            CachedPage {
                page,
                stored_at: now,
            },
        );
        trim_oldest(&mut entries, self.max_entries);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

fn prune_expired(entries: &mut HashMap<VideoQuery, CachedPage>, ttl: Duration, now: DateTime<Utc>) {
    entries.retain(|_, cached| now - cached.stored_at < ttl);
}

fn trim_oldest(entries: &mut HashMap<VideoQuery, CachedPage>, max_entries: usize) {
    if entries.len() <= max_entries {
        return;
    }

    let overflow = entries.len() - max_entries;
    let mut oldest = entries
        .iter()
        .map(|(query, cached)| (query.clone(), cached.stored_at))
        .collect::<Vec<_>>();
    oldest.sort_by_key(|(_, stored_at)| *stored_at);

    for (query, _) in oldest.into_iter().take(overflow) {
        entries.remove(&query);
    }
}

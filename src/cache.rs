use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::models::Campaign;

/// The fields breadcrumbs and headers need to label a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

impl From<&Campaign> for CampaignSummary {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name.clone(),
            is_active: campaign.is_active,
        }
    }
}

#[derive(Clone)]
struct CachedSummary {
    summary: CampaignSummary,
    created_at: Instant,
}

/// Short-lived, advisory cache of campaign summaries. Entries are keyed by
/// the owning user as well as the campaign, so a lookup never returns another
/// user's campaign.
///
/// Readers take a [`generation`](Self::generation) before loading from the
/// database and hand it back to [`insert`](Self::insert); a summary loaded
/// before an invalidation is then discarded instead of cached.
pub struct CampaignSummaryCache {
    ttl: Duration,
    max_entries: usize,
    generation: AtomicU64,
    entries: Mutex<HashMap<(Uuid, Uuid), CachedSummary>>,
}

impl CampaignSummaryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            generation: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: Uuid, campaign_id: Uuid) -> Option<CampaignSummary> {
        let mut entries = self.lock();
        self.evict_expired(&mut entries);
        entries
            .get(&(user_id, campaign_id))
            .map(|entry| entry.summary.clone())
    }

    /// Bumped by every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Caches `summary` unless an invalidation ran after `seen_generation`
    /// was read. Returns whether the entry was stored.
    pub fn insert(&self, user_id: Uuid, summary: CampaignSummary, seen_generation: u64) -> bool {
        let mut entries = self.lock();
        if self.generation.load(Ordering::Acquire) != seen_generation {
            return false;
        }
        self.evict_expired(&mut entries);
        let key = (user_id, summary.id);
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| *key)
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CachedSummary {
                summary,
                created_at: Instant::now(),
            },
        );
        true
    }

    pub fn invalidate(&self, user_id: Uuid, campaign_id: Uuid) {
        let mut entries = self.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(&(user_id, campaign_id));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, entries: &mut HashMap<(Uuid, Uuid), CachedSummary>) {
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(Uuid, Uuid), CachedSummary>> {
        // entries are plain values, a poisoned map is still consistent
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

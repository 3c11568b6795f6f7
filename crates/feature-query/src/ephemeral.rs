// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Ephemeral collection store
//!
//! Materialized filter results are kept under a unique name as an ordered list
//! of feature identities. Entries are created once and never overwritten;
//! every read refreshes the entry's access time. An optional background
//! reaper removes entries that stayed idle for longer than a configured
//! duration.
//!
//! The member list of an entry is published in a single map insert, so a
//! concurrent reader sees either the complete entry or nothing.

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use regex::Regex;
use shared_types::FeatureId;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::QueryError;

#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("collection name pattern is valid")
});

/// One materialized filter result
#[derive(Debug, Clone)]
pub struct EphemeralEntry {
    /// Member identities, in materialization order
    pub members: Arc<[FeatureId]>,
    /// Last time the entry was read
    pub last_accessed: Instant,
}

/// Name-keyed store of ephemeral collections
#[derive(Debug, Default)]
pub struct EphemeralStore {
    entries: DashMap<String, EphemeralEntry>,
}

impl EphemeralStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a caller supplied collection name
    pub fn validate_name(name: &str) -> Result<(), QueryError> {
        if NAME_PATTERN.is_match(name) {
            Ok(())
        } else {
            Err(QueryError::InvalidCollectionName {
                name: name.to_string(),
                reason: "must start with a letter or digit and contain only letters, digits, '_', '-' or '.' (at most 128 characters)".to_string(),
            })
        }
    }

    /// Publish a new entry; fails if `name` is already taken
    ///
    /// Concurrent inserts of the same name are serialized by the map shard
    /// lock: exactly one succeeds.
    pub fn insert_new(&self, name: &str, members: Vec<FeatureId>) -> Result<(), QueryError> {
        Self::validate_name(name)?;
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(QueryError::DuplicateName {
                name: name.to_string(),
            }),
            Entry::Vacant(vacant) => {
                let count = members.len();
                vacant.insert(EphemeralEntry {
                    members: members.into(),
                    last_accessed: Instant::now(),
                });
                debug!(name, members = count, "materialized ephemeral collection");
                Ok(())
            }
        }
    }

    /// Members of `name`, refreshing its access time
    pub fn members(&self, name: &str) -> Option<Arc<[FeatureId]>> {
        let mut entry = self.entries.get_mut(name)?;
        entry.last_accessed = Instant::now();
        Some(Arc::clone(&entry.members))
    }

    /// Whether `name` is an ephemeral collection; does not count as an access
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of all entries, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries idle for at least `idle` as of now
    pub fn sweep_idle(&self, idle: Duration) -> usize {
        self.sweep_idle_at(Instant::now(), idle)
    }

    /// Remove entries idle for at least `idle` as of `now`
    ///
    /// Eligible names are snapshotted first; each removal re-checks the access
    /// time under the entry lock, so an entry read after the snapshot survives.
    pub fn sweep_idle_at(&self, now: Instant, idle: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(idle) else {
            return 0;
        };
        let stale = self.idle_candidates(cutoff);
        let removed = self.remove_idle(&stale, cutoff);
        if removed > 0 {
            info!(
                removed,
                remaining = self.entries.len(),
                "reaped idle ephemeral collections"
            );
        }
        removed
    }

    /// Names last read at or before `cutoff`
    pub(crate) fn idle_candidates(&self, cutoff: Instant) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.value().last_accessed <= cutoff)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Remove those of `candidates` still unread since `cutoff`
    pub(crate) fn remove_idle(&self, candidates: &[String], cutoff: Instant) -> usize {
        candidates
            .iter()
            .filter(|name| {
                self.entries
                    .remove_if(name.as_str(), |_, entry| entry.last_accessed <= cutoff)
                    .is_some()
            })
            .count()
    }
}

/// Spawn the periodic idle sweep; it stops when `shutdown` is cancelled
pub fn spawn_idle_reaper(
    store: Arc<EphemeralStore>,
    idle: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        info!(
            idle_seconds = idle.as_secs(),
            interval_seconds = interval.as_secs(),
            "ephemeral collection reaper started"
        );
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("ephemeral collection reaper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    store.sweep_idle(idle);
                }
            }
        }
    })
}

// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::types::HourlyRow;

/// A computed hourly series, never mutated after creation, only replaced
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub range_key: String,
    pub computed_at: DateTime<Utc>,
    pub rows: Arc<Vec<HourlyRow>>,
    stored_at: Instant,
}

/// Short-TTL memoization of merged hourly series keyed by resolved range.
///
/// Concurrent misses for the same key each recompute; the last `put` wins.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Rows stored under `range_key` if they are younger than the TTL
    pub fn get(&self, range_key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock();
        let entry = entries.get(range_key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.clone())
        } else {
            debug!("Cache entry expired: {}", range_key);
            None
        }
    }

    /// Store `rows` under `range_key`, replacing any previous entry and
    /// dropping entries that have outlived the TTL
    pub fn put(&self, range_key: &str, rows: Arc<Vec<HourlyRow>>) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        entries.insert(
            range_key.to_owned(),
            CacheEntry {
                range_key: range_key.to_owned(),
                computed_at: Utc::now(),
                rows,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

//! Window manager
//!
//! ```text
//! windows: DashMap<WindowKey, Arc<WindowSlot>>
//!                                 │
//!                                 ├── Mutex<VecDeque<Entry>>   (time ordered)
//!                                 └── holds                    (pending readers)
//! instruments: DashMap<InstrumentId, {trader}>                 (for cross-trader reads)
//! ```
//!
//! Each window has its own lock. The map shard lock is never held while a
//! window lock is waited on from the write path, and a sweep only holds one
//! window lock at a time.
//!
//! Eviction is lazy: a read trims its own window, and a periodic sweep trims
//! the rest and drops windows that are empty and not held.

use chrono::{Duration, TimeZone, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};

use sentinel_core::{
    InstrumentId, LookupKind, NotFoundError, Timestamp, TradeEvent, TraderId, WindowKey,
    saturating_sub,
};
use sentinel_ports::WindowView;

use crate::config::WindowConfig;

const NO_WATERMARK: i64 = i64::MIN;

#[derive(Debug, Clone)]
struct Entry {
    /// Global arrival sequence; breaks timestamp ties
    seq: u64,
    event: Arc<TradeEvent>,
}

struct WindowSlot {
    entries: Mutex<VecDeque<Entry>>,
    holds: AtomicUsize,
}

impl WindowSlot {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            holds: AtomicUsize::new(0),
        }
    }
}

/// Keeps a window alive across sweeps while a detector reads it
pub struct WindowHold {
    slot: Option<Arc<WindowSlot>>,
}

impl Drop for WindowHold {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.holds.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Point-in-time copy of one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub key: WindowKey,
    pub events: Vec<TradeEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub windows: usize,
    pub events: usize,
    pub recorded: u64,
    pub evicted: u64,
    /// Dropped because a window hit its cap
    pub dropped: u64,
}

pub struct WindowManager {
    config: WindowConfig,
    windows: DashMap<WindowKey, Arc<WindowSlot>>,
    instruments: DashMap<InstrumentId, BTreeSet<TraderId>>,
    watermark: AtomicI64,
    sequence: AtomicU64,
    recorded: AtomicU64,
    evicted: AtomicU64,
    dropped: AtomicU64,
}

impl WindowManager {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            instruments: DashMap::new(),
            watermark: AtomicI64::new(NO_WATERMARK),
            sequence: AtomicU64::new(0),
            recorded: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn retention(&self) -> Duration {
        self.config.retention()
    }

    /// Append an event to its window
    pub fn record(&self, event: Arc<TradeEvent>) {
        let key = event.window_key();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);

        // Pin the slot while still under the map guard so a sweep cannot drop it
        // between lookup and insert
        let slot = {
            let slot = self
                .windows
                .entry(key.clone())
                .or_insert_with(|| Arc::new(WindowSlot::new()));
            slot.holds.fetch_add(1, Ordering::AcqRel);
            Arc::clone(slot.value())
        };

        {
            let mut entries = slot.entries.lock();
            let at = event.timestamp;
            // Stable: after every entry with timestamp <= at
            let pos = entries.partition_point(|e| e.event.timestamp <= at);
            entries.insert(
                pos,
                Entry {
                    seq,
                    event: Arc::clone(&event),
                },
            );
            let mut dropped = 0u64;
            while entries.len() > self.config.max_events_per_window {
                entries.pop_front();
                dropped += 1;
            }
            if dropped > 0 {
                self.dropped.fetch_add(dropped, Ordering::Relaxed);
                log::warn!(
                    "Window {} over capacity ({}), dropped {} oldest events",
                    key,
                    self.config.max_events_per_window,
                    dropped
                );
            }
        }
        slot.holds.fetch_sub(1, Ordering::AcqRel);

        self.instruments
            .entry(key.instrument_id)
            .or_default()
            .insert(key.trader_id);
        self.watermark
            .fetch_max(event.timestamp.timestamp_millis(), Ordering::AcqRel);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn watermark(&self) -> Option<Timestamp> {
        match self.watermark.load(Ordering::Acquire) {
            NO_WATERMARK => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    fn slot(&self, key: &WindowKey) -> Option<Arc<WindowSlot>> {
        self.windows.get(key).map(|s| Arc::clone(s.value()))
    }

    /// Events with `at - lookback <= ts <= at`, trimming expired entries first
    fn read(&self, key: &WindowKey, lookback: Duration, at: Timestamp) -> Vec<Entry> {
        let Some(slot) = self.slot(key) else {
            return Vec::new();
        };
        let from = saturating_sub(at, lookback);
        let mut entries = slot.entries.lock();
        if let Some(now) = self.watermark() {
            let trimmed = trim(&mut entries, saturating_sub(now, self.retention()));
            if trimmed > 0 {
                self.evicted.fetch_add(trimmed as u64, Ordering::Relaxed);
            }
        }
        let start = entries.partition_point(|e| e.event.timestamp < from);
        entries
            .iter()
            .skip(start)
            .take_while(|e| e.event.timestamp <= at)
            .cloned()
            .collect()
    }

    /// Chronological events of one window within `lookback` of the watermark
    pub fn events_in(&self, key: &WindowKey, lookback: Duration) -> Vec<Arc<TradeEvent>> {
        match self.watermark() {
            Some(now) => self.events_at(key, lookback, now),
            None => Vec::new(),
        }
    }

    pub fn events_at(
        &self,
        key: &WindowKey,
        lookback: Duration,
        at: Timestamp,
    ) -> Vec<Arc<TradeEvent>> {
        self.read(key, lookback, at)
            .into_iter()
            .map(|e| e.event)
            .collect()
    }

    /// All traders' events on one instrument, merged by timestamp then arrival
    pub fn instrument_events(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        at: Timestamp,
    ) -> Vec<Arc<TradeEvent>> {
        let traders = match self.instruments.get(instrument) {
            Some(set) => set.clone(),
            None => return Vec::new(),
        };
        let mut merged: Vec<Entry> = traders
            .into_iter()
            .flat_map(|trader| {
                self.read(&WindowKey::new(trader, instrument.clone()), lookback, at)
            })
            .collect();
        merged.sort_by(|a, b| {
            a.event
                .timestamp
                .cmp(&b.event.timestamp)
                .then(a.seq.cmp(&b.seq))
        });
        merged.into_iter().map(|e| e.event).collect()
    }

    /// Remove events older than `now - retention`; drop windows left empty and
    /// unheld. Returns the number of events evicted.
    pub fn evict_expired(&self, now: Timestamp) -> usize {
        let cutoff = saturating_sub(now, self.retention());
        let slots: Vec<(WindowKey, Arc<WindowSlot>)> = self
            .windows
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut evicted = 0;
        let mut emptied = Vec::new();
        for (key, slot) in slots {
            let now_empty = {
                let mut entries = slot.entries.lock();
                evicted += trim(&mut entries, cutoff);
                entries.is_empty()
            };
            if now_empty {
                emptied.push(key);
            }
        }

        let mut removed = 0;
        for key in emptied {
            let gone = self
                .windows
                .remove_if(&key, |_, slot| {
                    slot.holds.load(Ordering::Acquire) == 0 && slot.entries.lock().is_empty()
                })
                .is_some();
            if !gone {
                continue;
            }
            removed += 1;
            // Checked under the index lock; a concurrent record re-creates the
            // window before touching the index
            if let Some(mut traders) = self.instruments.get_mut(&key.instrument_id)
                && !self.windows.contains_key(&key)
            {
                traders.remove(&key.trader_id);
            }
        }
        self.instruments.retain(|_, traders| !traders.is_empty());

        self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        if evicted > 0 || removed > 0 {
            log::debug!(
                "Window sweep: evicted {} events, removed {} empty windows",
                evicted,
                removed
            );
        }
        evicted
    }

    /// Keep `key`'s window from being dropped until the guard is released
    pub fn hold(&self, key: &WindowKey) -> WindowHold {
        let slot = self.windows.get(key).map(|slot| {
            slot.holds.fetch_add(1, Ordering::AcqRel);
            Arc::clone(slot.value())
        });
        WindowHold { slot }
    }

    pub fn snapshot(&self, key: &WindowKey) -> Result<WindowSnapshot, NotFoundError> {
        let slot = self
            .slot(key)
            .ok_or_else(|| NotFoundError::new(LookupKind::Window, key.to_string()))?;
        let events = slot
            .entries
            .lock()
            .iter()
            .map(|e| TradeEvent::clone(&e.event))
            .collect();
        Ok(WindowSnapshot {
            key: key.clone(),
            events,
        })
    }

    pub fn contains(&self, key: &WindowKey) -> bool {
        self.windows.contains_key(key)
    }

    pub fn stats(&self) -> WindowStats {
        WindowStats {
            windows: self.windows.len(),
            events: self
                .windows
                .iter()
                .map(|slot| slot.entries.lock().len())
                .sum(),
            recorded: self.recorded.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

/// Pop entries older than `cutoff` off the front
fn trim(entries: &mut VecDeque<Entry>, cutoff: Timestamp) -> usize {
    let mut removed = 0;
    while entries.front().is_some_and(|e| e.event.timestamp < cutoff) {
        entries.pop_front();
        removed += 1;
    }
    removed
}

impl WindowView for WindowManager {
    fn events_in(&self, key: &WindowKey, lookback: Duration) -> Vec<Arc<TradeEvent>> {
        WindowManager::events_in(self, key, lookback)
    }

    fn events_at(
        &self,
        key: &WindowKey,
        lookback: Duration,
        at: Timestamp,
    ) -> Vec<Arc<TradeEvent>> {
        WindowManager::events_at(self, key, lookback, at)
    }

    fn instrument_events(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        at: Timestamp,
    ) -> Vec<Arc<TradeEvent>> {
        WindowManager::instrument_events(self, instrument, lookback, at)
    }

    fn watermark(&self) -> Option<Timestamp> {
        WindowManager::watermark(self)
    }
}

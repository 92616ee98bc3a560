use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};

use sentinel_core::EventId;

const SHARDS: usize = 16;

#[derive(Default)]
struct Shard {
    order: VecDeque<EventId>,
    ids: HashSet<EventId>,
}

/// Bounded set of recently applied event ids.
///
/// Oldest ids fall out first once a shard is full, so a duplicate arriving
/// after roughly `capacity` newer events is no longer recognised.
pub(crate) struct SeenSet {
    shards: Vec<Mutex<Shard>>,
    per_shard: usize,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(Shard::default())).collect(),
            per_shard: capacity.div_ceil(SHARDS).max(1),
        }
    }

    fn shard(&self, id: &str) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARDS]
    }

    /// Returns false if the id was already present
    pub fn insert(&self, id: &EventId) -> bool {
        let mut shard = self.shard(id).lock();
        if !shard.ids.insert(id.clone()) {
            return false;
        }
        shard.order.push_back(id.clone());
        while shard.order.len() > self.per_shard {
            if let Some(old) = shard.order.pop_front() {
                shard.ids.remove(&old);
            }
        }
        true
    }

    /// Forget an id whose application failed
    pub fn remove(&self, id: &EventId) {
        let mut shard = self.shard(id).lock();
        if shard.ids.remove(id) {
            shard.order.retain(|seen| seen != id);
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().ids.len()).sum()
    }
}

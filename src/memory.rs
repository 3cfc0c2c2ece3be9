//! MemoryHash: the in-memory multimap backend.
//!
//! Layout
//! - A bucket array of chain heads whose length (`capacity`) is zero before
//!   first use and a power of two afterwards.
//! - Nodes live in a slotmap arena. Each node owns one key, caches its hash,
//!   links to the next node of its bucket chain and heads its value chain.
//! - Values live in a second arena. A node's values form a singly linked
//!   chain with the most recently added value first.
//!
//! Links are arena handles rather than pointers, so growing the bucket array
//! relinks nodes in place without moving them, and a node or value is freed
//! exactly when it is removed from its arena.

use crate::config::MemoryConfig;
use crate::datum::Datum;
use crate::error::{HashError, Result};
use crate::factory::{BackendCursor, CursorMode, Entry, HashBackend, HashFactory};
use crate::hash::Hash;
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

new_key_type! {
    struct NodeKey;
    struct ValueKey;
}

#[derive(Debug)]
struct Node {
    key: Box<[u8]>,
    next: Option<NodeKey>,
    hash: u64,
    value_count: usize,
    values: Option<ValueKey>,
}

#[derive(Debug)]
struct Value {
    data: Box<[u8]>,
    next: Option<ValueKey>,
}

/// Result of a chain walk: the node, its bucket and its chain predecessor.
#[derive(Copy, Clone, Debug)]
struct Found {
    node: NodeKey,
    bucket: usize,
    prev: Option<NodeKey>,
}

/// Shift-xor hash over the key bytes. Local to this backend; other backends
/// are free to hash differently and no stability across versions is implied.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |h, &b| (h << 3) ^ u64::from(b))
}

fn copy_bytes(bytes: &[u8], what: &'static str) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(bytes.len())
        .map_err(|_| HashError::AllocationFailure { what })?;
    v.extend_from_slice(bytes);
    Ok(v)
}

#[derive(Debug)]
pub struct MemoryHash {
    config: MemoryConfig,
    buckets: Vec<Option<NodeKey>>,
    nodes: SlotMap<NodeKey, Node>,
    values: SlotMap<ValueKey, Value>,
    occupied: usize,
}

impl MemoryHash {
    pub fn new() -> Self {
        Self::from_valid(MemoryConfig::default())
    }

    /// Engine with a custom configuration; `Err(InvalidConfig)` unless
    /// [`MemoryConfig::validate`] accepts it.
    pub fn with_config(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: MemoryConfig) -> Self {
        Self {
            config,
            buckets: Vec::new(),
            nodes: SlotMap::with_key(),
            values: SlotMap::with_key(),
            occupied: 0,
        }
    }

    /// Length of the bucket array; zero until the first `put`.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn occupied_buckets(&self) -> usize {
        self.occupied
    }

    pub fn keys_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn values_count(&self) -> usize {
        self.values.len()
    }

    pub fn load_factor(&self) -> u32 {
        self.config.load_factor
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash & (self.buckets.len() as u64 - 1)) as usize
    }

    fn find(&self, key: &[u8]) -> Option<Found> {
        if self.buckets.is_empty() {
            return None;
        }
        let bucket = self.bucket_of(hash_bytes(key));
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if *node.key == *key {
                return Some(Found { node: k, bucket, prev });
            }
            prev = Some(k);
            cur = node.next;
        }
        None
    }

    fn over_load_factor(&self) -> bool {
        1000 * self.occupied >= self.config.load_factor as usize * self.buckets.len()
    }

    /// Resize check run before every insertion.
    ///
    /// Afterwards `1000 * occupied < load_factor * capacity`. Doubling can
    /// spread long chains over more buckets than before, so it repeats until
    /// that holds. The insertion that follows may fill one more bucket, so
    /// between puts the ratio can reach the load factor, or pass it on very
    /// small tables.
    fn ensure_capacity(&mut self) -> Result<()> {
        if self.buckets.is_empty() {
            let mut buckets = Vec::new();
            buckets
                .try_reserve_exact(self.config.initial_capacity)
                .map_err(|_| HashError::AllocationFailure {
                    what: "allocating the bucket array",
                })?;
            buckets.resize(self.config.initial_capacity, None);
            self.buckets = buckets;
            return Ok(());
        }
        while self.over_load_factor() {
            self.grow()?;
        }
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let from = self.buckets.len();
        let to = from << 1;
        let mut buckets: Vec<Option<NodeKey>> = Vec::new();
        buckets
            .try_reserve_exact(to)
            .map_err(|_| HashError::AllocationFailure {
                what: "growing the bucket array",
            })?;
        buckets.resize(to, None);

        let mask = to as u64 - 1;
        let mut occupied = 0;
        for head in self.buckets.drain(..) {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut self.nodes[k];
                cur = node.next;
                let b = (node.hash & mask) as usize;
                if buckets[b].is_none() {
                    occupied += 1;
                }
                node.next = buckets[b];
                buckets[b] = Some(k);
            }
        }
        self.buckets = buckets;
        self.occupied = occupied;
        debug!(from, to, occupied, keys = self.nodes.len(), "memory hash resized");
        Ok(())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_capacity()?;

        // Copy everything first so a failed allocation leaves the chains untouched.
        let data = copy_bytes(value, "copying a value")?.into_boxed_slice();
        let node_key = match self.find(key) {
            Some(found) => found.node,
            None => {
                let key_copy = copy_bytes(key, "copying a key")?.into_boxed_slice();
                let hash = hash_bytes(key);
                let bucket = self.bucket_of(hash);
                let head = self.buckets[bucket];
                if head.is_none() {
                    self.occupied += 1;
                }
                let k = self.nodes.insert(Node {
                    key: key_copy,
                    next: head,
                    hash,
                    value_count: 0,
                    values: None,
                });
                self.buckets[bucket] = Some(k);
                k
            }
        };

        let node = &mut self.nodes[node_key];
        let v = self.values.insert(Value {
            data,
            next: node.values,
        });
        node.values = Some(v);
        node.value_count += 1;
        Ok(())
    }

    pub fn exists(&self, key: &[u8], value: Option<&[u8]>) -> bool {
        let Some(found) = self.find(key) else {
            return false;
        };
        let Some(value) = value else {
            return true;
        };
        let mut cur = self.nodes[found.node].values;
        while let Some(k) = cur {
            let v = &self.values[k];
            if *v.data == *value {
                return true;
            }
            cur = v.next;
        }
        false
    }

    pub fn delete_key(&mut self, key: &[u8]) -> bool {
        match self.find(key) {
            Some(found) => {
                self.unlink(found);
                true
            }
            None => false,
        }
    }

    pub fn delete_key_value(&mut self, key: &[u8], value: &[u8]) -> bool {
        let Some(found) = self.find(key) else {
            return false;
        };
        let mut prev: Option<ValueKey> = None;
        let mut cur = self.nodes[found.node].values;
        while let Some(k) = cur {
            let v = &self.values[k];
            let next = v.next;
            if *v.data == *value {
                match prev {
                    None => self.nodes[found.node].values = next,
                    Some(p) => self.values[p].next = next,
                }
                self.values.remove(k);
                let node = &mut self.nodes[found.node];
                node.value_count -= 1;
                if node.value_count == 0 {
                    self.unlink(found);
                }
                return true;
            }
            prev = Some(k);
            cur = next;
        }
        false
    }

    /// Unlink a node from its bucket chain and free it with its value chain.
    fn unlink(&mut self, found: Found) {
        let Some(node) = self.nodes.remove(found.node) else {
            return;
        };
        match found.prev {
            None => self.buckets[found.bucket] = node.next,
            Some(p) => self.nodes[p].next = node.next,
        }
        if self.buckets[found.bucket].is_none() {
            self.occupied -= 1;
        }
        let mut cur = node.values;
        while let Some(k) = cur {
            cur = self.values.remove(k).and_then(|v| v.next);
        }
    }

    fn clear(&mut self) {
        self.buckets = Vec::new();
        self.nodes.clear();
        self.values.clear();
        self.occupied = 0;
    }

    /// First occupied bucket at or after `from`, with its chain head.
    fn next_occupied(&self, from: usize) -> Option<(usize, NodeKey)> {
        self.buckets
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(i, head)| head.map(|k| (i, k)))
    }

    pub fn cursor(&self) -> MemoryCursor<'_> {
        MemoryCursor {
            hash: self,
            bucket: 0,
            node: None,
            value: None,
            finished: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let cap = self.buckets.len();
        assert!(cap == 0 || cap.is_power_of_two(), "capacity {} not a power of two", cap);
        let mut occupied = 0;
        let mut nodes = 0;
        let mut values = 0;
        for (i, head) in self.buckets.iter().enumerate() {
            if head.is_some() {
                occupied += 1;
            }
            let mut cur = *head;
            while let Some(k) = cur {
                let n = &self.nodes[k];
                assert_eq!(n.hash, hash_bytes(&n.key));
                assert_eq!(self.bucket_of(n.hash), i, "node in wrong bucket");
                let mut chain = 0;
                let mut v = n.values;
                while let Some(vk) = v {
                    chain += 1;
                    v = self.values[vk].next;
                }
                assert!(chain > 0, "node without values");
                assert_eq!(chain, n.value_count);
                nodes += 1;
                values += chain;
                cur = n.next;
            }
        }
        assert_eq!(occupied, self.occupied);
        assert_eq!(nodes, self.nodes.len());
        assert_eq!(values, self.values.len());
    }
}

impl Default for MemoryHash {
    fn default() -> Self {
        Self::new()
    }
}

impl HashBackend for MemoryHash {
    fn open(
        &mut self,
        identifier: &str,
        _mode: u32,
        _is_writable: bool,
        _is_new: bool,
        _options: Option<&Hash>,
    ) -> Result<()> {
        debug!(identifier, load_factor = self.config.load_factor, "opening memory hash");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(
            keys = self.nodes.len(),
            values = self.values.len(),
            "closing memory hash"
        );
        self.clear();
        Ok(())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        MemoryHash::put(self, key, value)
    }

    fn exists(&self, key: &[u8], value: Option<&[u8]>) -> Result<bool> {
        Ok(MemoryHash::exists(self, key, value))
    }

    fn delete_key(&mut self, key: &[u8]) -> Result<bool> {
        Ok(MemoryHash::delete_key(self, key))
    }

    fn delete_key_value(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        Ok(MemoryHash::delete_key_value(self, key, value))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_fd(&self) -> Option<i32> {
        None
    }

    fn values_count(&self) -> Option<usize> {
        Some(self.values.len())
    }

    fn cursor(&self) -> Result<Box<dyn BackendCursor + '_>> {
        Ok(Box::new(MemoryHash::cursor(self)))
    }
}

/// Cursor state: the current bucket, node and value.
///
/// Borrows the engine immutably, so the structure cannot change underneath
/// a live cursor.
#[derive(Debug)]
pub struct MemoryCursor<'a> {
    hash: &'a MemoryHash,
    bucket: usize,
    node: Option<NodeKey>,
    value: Option<ValueKey>,
    finished: bool,
}

impl<'a> MemoryCursor<'a> {
    fn position(&mut self, bucket: usize, node: NodeKey) {
        self.bucket = bucket;
        self.node = Some(node);
        self.value = self.hash.nodes[node].values;
    }

    fn exhaust(&mut self) {
        self.node = None;
        self.value = None;
    }

    fn copy_out(&self, want_value: bool) -> Result<Option<Entry>> {
        let Some(nk) = self.node else {
            return Ok(None);
        };
        let node = &self.hash.nodes[nk];
        let key = Datum::new(copy_bytes(&node.key, "copying a key out")?);
        let value = match (want_value, self.value) {
            (true, Some(vk)) => Some(Datum::new(copy_bytes(
                &self.hash.values[vk].data,
                "copying a value out",
            )?)),
            _ => None,
        };
        Ok(Some(Entry { key, value }))
    }
}

impl<'a> BackendCursor for MemoryCursor<'a> {
    fn get(&mut self, mode: CursorMode<'_>, want_value: bool) -> Result<Option<Entry>> {
        if self.finished {
            return Err(HashError::CursorFinished);
        }
        let hash = self.hash;
        match mode {
            CursorMode::Set(key) => match hash.find(key) {
                Some(found) => self.position(found.bucket, found.node),
                None => {
                    self.exhaust();
                    return Ok(None);
                }
            },
            CursorMode::First => match hash.next_occupied(0) {
                Some((bucket, node)) => self.position(bucket, node),
                None => {
                    self.exhaust();
                    return Ok(None);
                }
            },
            CursorMode::Next => {
                let Some(cur) = self.node else {
                    return Ok(None);
                };
                let next = match hash.nodes[cur].next {
                    Some(node) => Some((self.bucket, node)),
                    None => hash.next_occupied(self.bucket + 1),
                };
                match next {
                    Some((bucket, node)) => self.position(bucket, node),
                    None => {
                        self.exhaust();
                        return Ok(None);
                    }
                }
            }
            CursorMode::NextValue => {
                // The key stays current once its chain runs out, so a
                // following Next still continues from it.
                if self.node.is_none() {
                    return Ok(None);
                }
                let Some(cur) = self.value else {
                    return Ok(None);
                };
                self.value = hash.values[cur].next;
                if self.value.is_none() {
                    return Ok(None);
                }
            }
        }
        self.copy_out(want_value)
    }

    fn finish(&mut self) {
        self.exhaust();
        self.finished = true;
    }
}

/// Factory for memory hashes, registered as `"memory"` by default.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    config: MemoryConfig,
}

impl MemoryFactory {
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

impl HashFactory for MemoryFactory {
    fn context_length(&self) -> usize {
        core::mem::size_of::<MemoryHash>()
    }

    fn cursor_context_length(&self) -> usize {
        core::mem::size_of::<MemoryCursor<'static>>()
    }

    fn create(&self) -> Result<Box<dyn HashBackend>> {
        Ok(Box::new(MemoryHash::from_valid(self.config)))
    }
}

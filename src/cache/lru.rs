//! LRU Tracker Module
//!
//! Implements the recency index used to pick eviction victims.

use std::collections::HashMap;

/// A slot in the node slab.
#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks use order for LRU eviction.
///
/// A doubly-linked list threaded through a slab of nodes, plus a key to slot
/// map, so that touching, removing and evicting are all O(1):
/// - Head = least recently used
/// - Tail = most recently used
///
/// Freed slots are recycled through a free list.
#[derive(Debug, Default)]
pub struct LruTracker {
    nodes: Vec<Node>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// A new key is appended at the tail; an existing key is moved there.
    pub fn touch(&mut self, key: &str) {
        if !self.lift(key) {
            let slot = self.alloc(key.to_string());
            self.link_back(slot);
            self.index.insert(key.to_string(), slot);
        }
    }

    // == Lift ==
    /// Moves an existing key to the tail.
    ///
    /// Returns false without touching anything if the key is not tracked.
    pub fn lift(&mut self, key: &str) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        if self.tail != Some(slot) {
            self.unlink(slot);
            self.link_back(slot);
        }
        true
    }

    // == Remove ==
    /// Removes a key from the tracker.
    ///
    /// Returns true if the key was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.unlink(slot);
                self.release(slot);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let slot = self.head?;
        self.unlink(slot);
        let key = self.release(slot);
        self.index.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.head.map(|slot| self.nodes[slot].key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Clear ==
    /// Forgets every key and releases the slab.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::successors(self.head, move |&slot| self.nodes[slot].next)
            .map(move |slot| self.nodes[slot].key.as_str())
    }

    fn alloc(&mut self, key: String) -> usize {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> String {
        self.free.push(slot);
        std::mem::take(&mut self.nodes[slot].key)
    }

    fn link_back(&mut self, slot: usize) {
        self.nodes[slot].prev = self.tail;
        self.nodes[slot].next = None;
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }
}

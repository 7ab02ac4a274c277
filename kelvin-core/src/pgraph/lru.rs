use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

/// Opaque reference to an entry of an [`Lru`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruHandle {
    index: usize,
    generation: u32,
}

struct Slot<K, V> {
    entry: Option<(K, V)>,
    generation: u32,
    prev: usize,
    next: usize,
}

/// Fixed capacity least-recently-used cache.
///
/// Entries live in a preallocated arena of slots, linked from most recently
/// used (`head`) to least recently used (`tail`). Unused slots are kept in a
/// free list.
pub struct Lru<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    map: HashMap<K, usize>,
    head: usize,
    tail: usize,
}

impl<K: Hash + Eq + Clone, V> Lru<K, V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU cache needs at least one slot");

        let slots = (0..capacity)
            .map(|_| Slot {
                entry: None,
                generation: 0,
                prev: NIL,
                next: NIL,
            })
            .collect();

        Self {
            slots,
            // pop from the end, so slot 0 is used first
            free: (0..capacity).rev().collect(),
            map: HashMap::with_capacity(capacity),
            head: NIL,
            tail: NIL,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Finds `key` and marks it as the most recently used entry
    pub fn lookup(&mut self, key: &K) -> Option<LruHandle> {
        let index = *self.map.get(key)?;
        self.unlink(index);
        self.push_front(index);
        Some(self.handle(index))
    }

    /// Inserts a new entry as the most recently used one.
    ///
    /// When the cache is full the least recently used entry is evicted and
    /// returned, so the caller can release what it owns.
    pub fn insert(&mut self, key: K, value: V) -> (LruHandle, Option<(K, V)>) {
        assert!(!self.map.contains_key(&key), "key already in LRU cache");

        let mut evicted = None;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.tail;
                self.unlink(index);
                let slot = &mut self.slots[index];
                let (old_key, old_value) = slot
                    .entry
                    .take()
                    .unwrap_or_else(|| unreachable!("linked LRU slot without entry"));
                slot.generation = slot.generation.wrapping_add(1);
                self.map.remove(&old_key);
                evicted = Some((old_key, old_value));
                index
            }
        };

        self.map.insert(key.clone(), index);
        self.slots[index].entry = Some((key, value));
        self.push_front(index);

        (self.handle(index), evicted)
    }

    pub fn get(&self, handle: LruHandle) -> &V {
        let slot = self.valid_slot(handle);
        match &slot.entry {
            Some((_, value)) => value,
            None => unreachable!(),
        }
    }

    pub fn get_mut(&mut self, handle: LruHandle) -> &mut V {
        self.valid_slot(handle);
        match &mut self.slots[handle.index].entry {
            Some((_, value)) => value,
            None => unreachable!(),
        }
    }

    /// Removes every entry, returning them from most to least recently used
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.len());
        let mut index = self.head;
        while index != NIL {
            let slot = &mut self.slots[index];
            let next = slot.next;
            if let Some(entry) = slot.entry.take() {
                entries.push(entry);
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.prev = NIL;
            slot.next = NIL;
            self.free.push(index);
            index = next;
        }
        self.head = NIL;
        self.tail = NIL;
        self.map.clear();
        entries
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut index = self.head;
        while index != NIL {
            let slot = &self.slots[index];
            if let Some((key, _)) = &slot.entry {
                keys.push(key.clone());
            }
            index = slot.next;
        }
        keys
    }

    fn valid_slot(&self, handle: LruHandle) -> &Slot<K, V> {
        let slot = &self.slots[handle.index];
        assert!(
            slot.generation == handle.generation && slot.entry.is_some(),
            "stale LRU handle {:?}",
            handle
        );
        slot
    }

    fn handle(&self, index: usize) -> LruHandle {
        LruHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let slot = &self.slots[index];
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.slots[index].prev = NIL;
        self.slots[index].next = NIL;
    }

    fn push_front(&mut self, index: usize) {
        self.slots[index].prev = NIL;
        self.slots[index].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = index;
        }
        self.head = index;
        if self.tail == NIL {
            self.tail = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut lru = Lru::new(2);
        let (_, evicted) = lru.insert("a", 1);
        assert!(evicted.is_none());
        lru.insert("b", 2);

        let (_, evicted) = lru.insert("c", 3);
        assert_eq!(evicted, Some(("a", 1)));
        assert!(lru.lookup(&"a").is_none());
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn lookup_promotes() {
        let mut lru = Lru::new(2);
        lru.insert("a", 1);
        lru.insert("b", 2);

        let handle = lru.lookup(&"a").unwrap();
        assert_eq!(*lru.get(handle), 1);
        assert_eq!(lru.keys(), vec!["a", "b"]);

        let (_, evicted) = lru.insert("c", 3);
        assert_eq!(evicted, Some(("b", 2)));
        assert_eq!(lru.keys(), vec!["c", "a"]);
    }

    #[test]
    fn handles_stay_valid_until_eviction() {
        let mut lru = Lru::new(1);
        let (handle, _) = lru.insert(1u32, "one");
        *lru.get_mut(handle) = "uno";
        assert_eq!(*lru.get(handle), "uno");

        let (new_handle, evicted) = lru.insert(2, "two");
        assert_eq!(evicted, Some((1, "uno")));
        assert_ne!(handle, new_handle);
    }

    #[test]
    #[should_panic]
    fn stale_handle_panics() {
        let mut lru = Lru::new(1);
        let (handle, _) = lru.insert(1u32, 1u32);
        lru.insert(2, 2);
        lru.get(handle);
    }

    #[test]
    fn drain_frees_all_slots() {
        let mut lru = Lru::new(3);
        lru.insert(1u32, 10u32);
        lru.insert(2, 20);
        let entries = lru.drain();
        assert_eq!(entries, vec![(2, 20), (1, 10)]);
        assert!(lru.is_empty());

        for i in 0..3 {
            let (_, evicted) = lru.insert(i, i);
            assert!(evicted.is_none());
        }
    }
}

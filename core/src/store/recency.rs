use std::collections::HashMap;

struct Slot<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Keyed entries ordered by recency, most recently upserted first.
///
/// Entries live in a dense slot vector; the order is a doubly-linked list over
/// slot indices and `index` maps each key to its slot. Promote-to-front and
/// pop-from-back are O(1), and freed slots are reused.
pub struct RecencyQueue<V> {
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<V> RecencyQueue<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Inserts or replaces the value for `key` and moves it to the front.
    /// Returns the replaced value, if any.
    pub fn upsert(&mut self, key: &str, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(key) {
            let previous = self.slots[idx]
                .as_mut()
                .map(|slot| std::mem::replace(&mut slot.value, value));
            if self.head != Some(idx) {
                self.unlink(idx);
                self.link_front(idx);
            }
            return previous;
        }

        let slot = Slot {
            key: key.to_string(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key.to_string(), idx);
        self.link_front(idx);
        None
    }

    /// Least recently upserted entry.
    pub fn back(&self) -> Option<(&str, &V)> {
        let idx = self.tail?;
        self.slots[idx]
            .as_ref()
            .map(|slot| (slot.key.as_str(), &slot.value))
    }

    pub fn pop_back(&mut self) -> Option<(String, V)> {
        let idx = self.tail?;
        self.unlink(idx);
        let slot = self.slots[idx].take()?;
        self.index.remove(&slot.key);
        self.free.push(idx);
        Some((slot.key, slot.value))
    }

    /// Walks entries front (newest) to back (oldest).
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(slot) = self.slots[p].as_mut() {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = self.slots[n].as_mut() {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(slot) = self.slots[h].as_mut() {
                    slot.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

impl<V> Default for RecencyQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, V> {
    queue: &'a RecencyQueue<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let slot = self.queue.slots[idx].as_ref()?;
        self.cursor = slot.next;
        Some((slot.key.as_str(), &slot.value))
    }
}

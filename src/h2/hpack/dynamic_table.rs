//! HPACK dynamic table (spec §4.5/§3): one instance each for send and
//! receive sides. Entry size is `name.len() + value.len() + 32` per RFC 7541
//! §4.1; eviction is FIFO (oldest entry — the one inserted longest ago —
//! evicted first) until the table fits its size bound.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub value: String,
}

impl Entry {
    fn size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

#[derive(Debug)]
pub struct DynamicTable {
    entries: VecDeque<Entry>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        DynamicTable { entries: VecDeque::new(), size: 0, max_size }
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Update the table's maximum size, evicting as needed. Used both for
    /// locally-initiated size updates and peer SETTINGS-driven changes.
    pub fn set_max_size(&mut self, new_max: usize) {
        self.max_size = new_max;
        self.evict_to_fit();
    }

    pub fn insert(&mut self, name: String, value: String) {
        let entry = Entry { name, value };
        let entry_size = entry.size();
        if entry_size > self.max_size {
            // RFC 7541 §4.4: an entry larger than the table clears the
            // entire table rather than being inserted.
            self.entries.clear();
            self.size = 0;
            return;
        }
        self.size += entry_size;
        self.entries.push_front(entry);
        self.evict_to_fit();
    }

    fn evict_to_fit(&mut self) {
        while self.size > self.max_size {
            if let Some(evicted) = self.entries.pop_back() {
                self.size -= evicted.size();
            } else {
                break;
            }
        }
    }

    /// Dynamic-table index `i` (1-indexed, most-recently-inserted first).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        if index == 0 {
            return None;
        }
        self.entries.get(index - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_exact(&self, name: &str, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name && e.value == value)
            .map(|i| i + 1)
    }

    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name).map(|i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut t = DynamicTable::new(100);
        t.insert("a".into(), "1".into()); // size 34
        t.insert("b".into(), "2".into()); // size 34, total 68
        t.insert("c".into(), "3".into()); // size 34, total 102 > 100 -> evict oldest ("a")
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1).unwrap().name, "c");
        assert_eq!(t.get(2).unwrap().name, "b");
    }

    #[test]
    fn shrinking_max_size_evicts() {
        let mut t = DynamicTable::new(1000);
        t.insert("name".into(), "value".into());
        assert_eq!(t.len(), 1);
        t.set_max_size(0);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn entry_larger_than_table_clears_it() {
        let mut t = DynamicTable::new(40);
        t.insert("small".into(), "v".into());
        assert_eq!(t.len(), 1);
        t.insert("this-name-is-too-big".into(), "and-this-value-too".into());
        assert_eq!(t.len(), 0);
    }
}

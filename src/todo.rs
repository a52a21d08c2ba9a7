//! ToDo Queue
//!
//! Unexpanded label entries wait here, stratified into priority buckets by
//! the kind of the referenced concept. The bucket order is a configuration
//! value injected at construction, so deterministic work (unfolding,
//! conjunctions) can be drained before branching work (disjunctions,
//! number restrictions).
//!
//! A snapshot of every bucket is taken on `save` and rolled back on
//! `restore`, mirroring the completion graph's levels.

use crate::deps::BranchLevel;
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};

/// Classification of a label entry for queue prioritisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Named concept or nominal unfolding
    Id,
    And,
    Or,
    /// Existential or at-least: creates successors
    Exists,
    Forall,
    /// At-most: choose-and-merge
    Le,
    /// At-most on a nominal node with blockable predecessors
    Nn,
}

/// Priority table: lower value drains earlier. Part of the configuration
/// surface; the defaults keep deterministic rules ahead of generating ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityTable {
    #[serde(default = "default_priority_nn")]
    pub nn: usize,
    #[serde(default = "default_priority_id")]
    pub id: usize,
    #[serde(default = "default_priority_and")]
    pub and: usize,
    #[serde(default = "default_priority_or")]
    pub or: usize,
    #[serde(default = "default_priority_forall")]
    pub forall: usize,
    #[serde(default = "default_priority_exists")]
    pub exists: usize,
    #[serde(default = "default_priority_le")]
    pub le: usize,
}

fn default_priority_nn() -> usize {
    0
}
fn default_priority_id() -> usize {
    1
}
fn default_priority_and() -> usize {
    1
}
fn default_priority_or() -> usize {
    2
}
fn default_priority_forall() -> usize {
    3
}
fn default_priority_exists() -> usize {
    4
}
fn default_priority_le() -> usize {
    5
}

impl Default for PriorityTable {
    fn default() -> Self {
        PriorityTable {
            nn: default_priority_nn(),
            id: default_priority_id(),
            and: default_priority_and(),
            or: default_priority_or(),
            forall: default_priority_forall(),
            exists: default_priority_exists(),
            le: default_priority_le(),
        }
    }
}

impl PriorityTable {
    pub fn bucket(&self, kind: EntryKind) -> usize {
        match kind {
            EntryKind::Nn => self.nn,
            EntryKind::Id => self.id,
            EntryKind::And => self.and,
            EntryKind::Or => self.or,
            EntryKind::Forall => self.forall,
            EntryKind::Exists => self.exists,
            EntryKind::Le => self.le,
        }
    }

    fn bucket_count(&self) -> usize {
        1 + [
            self.nn,
            self.id,
            self.and,
            self.or,
            self.forall,
            self.exists,
            self.le,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Reference to an unexpanded label entry: the concept is read back from
/// the node label at `(complex, offset)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToDoEntry {
    pub node: NodeId,
    pub complex: bool,
    pub offset: usize,
}

#[derive(Debug, Default, Clone)]
struct Bucket {
    entries: Vec<ToDoEntry>,
    head: usize,
}

/// Priority-stratified queue of unexpanded entries with save/restore
#[derive(Debug)]
pub struct ToDoQueue {
    buckets: Vec<Bucket>,
    table: PriorityTable,
    /// Snapshot per branch level: `(head, len)` of every bucket
    saves: Vec<Vec<(usize, usize)>>,
}

impl ToDoQueue {
    pub fn new(table: PriorityTable) -> Self {
        let buckets = vec![Bucket::default(); table.bucket_count()];
        ToDoQueue {
            buckets,
            table,
            saves: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        for b in &mut self.buckets {
            b.entries.clear();
            b.head = 0;
        }
        self.saves.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.head == b.entries.len())
    }

    /// Queue an entry into the bucket its kind maps to
    pub fn add_entry(&mut self, node: NodeId, complex: bool, offset: usize, kind: EntryKind) {
        let bucket = self.table.bucket(kind);
        self.buckets[bucket].entries.push(ToDoEntry {
            node,
            complex,
            offset,
        });
    }

    /// Pop from the highest-priority non-empty bucket
    pub fn next_entry(&mut self) -> Option<ToDoEntry> {
        for b in &mut self.buckets {
            if b.head < b.entries.len() {
                let entry = b.entries[b.head];
                b.head += 1;
                return Some(entry);
            }
        }
        None
    }

    /// Snapshot the queue for branch level `level`
    pub fn save(&mut self, level: BranchLevel) {
        let snapshot: Vec<(usize, usize)> = self
            .buckets
            .iter()
            .map(|b| (b.head, b.entries.len()))
            .collect();
        let idx = level as usize;
        self.saves.truncate(idx);
        while self.saves.len() < idx {
            self.saves.push(Vec::new());
        }
        self.saves.push(snapshot);
    }

    /// Roll the queue back to the snapshot taken at `level`
    pub fn restore(&mut self, level: BranchLevel) {
        let snapshot = &self.saves[level as usize];
        for (b, &(head, len)) in self.buckets.iter_mut().zip(snapshot.iter()) {
            b.entries.truncate(len);
            b.head = head;
        }
        self.saves.truncate(level as usize + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize, offset: usize) -> (NodeId, bool, usize) {
        (NodeId(n), false, offset)
    }

    #[test]
    fn drains_in_priority_order() {
        let mut todo = ToDoQueue::new(PriorityTable::default());
        let (n, c, _) = entry(0, 0);
        todo.add_entry(n, c, 0, EntryKind::Exists);
        todo.add_entry(n, c, 1, EntryKind::And);
        todo.add_entry(n, c, 2, EntryKind::Or);

        assert_eq!(todo.next_entry().map(|e| e.offset), Some(1)); // And first
        assert_eq!(todo.next_entry().map(|e| e.offset), Some(2)); // then Or
        assert_eq!(todo.next_entry().map(|e| e.offset), Some(0)); // Exists last
        assert!(todo.next_entry().is_none());
    }

    #[test]
    fn save_restore_round_trips() {
        let mut todo = ToDoQueue::new(PriorityTable::default());
        let (n, c, _) = entry(0, 0);
        todo.add_entry(n, c, 0, EntryKind::And);
        todo.save(1);

        todo.add_entry(n, c, 1, EntryKind::And);
        assert_eq!(todo.next_entry().map(|e| e.offset), Some(0));
        todo.restore(1);

        // entry 0 is unconsumed again, entry 1 is gone
        assert_eq!(todo.next_entry().map(|e| e.offset), Some(0));
        assert!(todo.next_entry().is_none());
    }

    #[test]
    fn fifo_within_a_bucket() {
        let mut todo = ToDoQueue::new(PriorityTable::default());
        let (n, c, _) = entry(3, 0);
        for i in 0..4 {
            todo.add_entry(n, c, i, EntryKind::Forall);
        }
        let order: Vec<usize> = std::iter::from_fn(|| todo.next_entry().map(|e| e.offset)).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}

use std::collections::VecDeque;

use crate::models::NotificationEntry;

/// Newest-first live log of received alerts.
///
/// With a capacity the oldest entry is evicted on overflow; without one the
/// list grows for as long as its owner lives. No dedup: the same alert firing
/// twice yields two entries.
#[derive(Debug, Clone, Default)]
pub struct NotificationList {
    entries: VecDeque<NotificationEntry>,
    capacity: Option<usize>,
}

impl NotificationList {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    pub fn prepend(&mut self, entry: NotificationEntry) {
        self.entries.push_front(entry);
        if let Some(cap) = self.capacity {
            self.entries.truncate(cap);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<NotificationEntry> {
        self.entries.iter().cloned().collect()
    }
}

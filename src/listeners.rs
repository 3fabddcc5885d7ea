//! Explicit listener registration table.
//!
//! Registrations are keyed by (node, kind, tag) so attaching the same
//! listener twice is a no-op and teardown has exactly one path.

use std::collections::BTreeSet;

use crate::host::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
}

impl ListenerKind {
    /// Kinds a drag session tracks after the initial press.
    pub const SESSION: [ListenerKind; 3] = [
        ListenerKind::PointerMove,
        ListenerKind::PointerUp,
        ListenerKind::PointerCancel,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Registration {
    pub node: NodeId,
    pub kind: ListenerKind,
    pub tag: &'static str,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: BTreeSet<Registration>,
    attached_total: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the registration already exists.
    pub fn attach_once(&mut self, node: NodeId, kind: ListenerKind, tag: &'static str) -> bool {
        let inserted = self.entries.insert(Registration { node, kind, tag });
        if inserted {
            self.attached_total += 1;
        }
        inserted
    }

    /// Drop every registration carrying `tag`. Returns how many were removed.
    pub fn detach_tag(&mut self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.tag != tag);
        before - self.entries.len()
    }

    pub fn is_attached(&self, node: NodeId, kind: ListenerKind, tag: &'static str) -> bool {
        self.entries.contains(&Registration { node, kind, tag })
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registrations ever made, including ones since detached.
    pub fn attached_total(&self) -> u64 {
        self.attached_total
    }
}

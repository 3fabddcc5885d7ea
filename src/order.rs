//! Item identity and DOM order application.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::constants::{ID_ATTRIBUTES, SIGNATURE_SEPARATOR};
use crate::host::{GridHost, NodeId};

/// Custom item id getter. Returning `None` (or a blank string) falls through
/// to the id attributes.
pub type IdGetter = Rc<dyn Fn(&dyn GridHost, NodeId) -> Option<String>>;

/// Trimmed id, or `None` when nothing is left.
pub fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Joined id string used to detect no-op writes.
pub fn order_signature(ids: &[String]) -> String {
    ids.join(SIGNATURE_SEPARATOR)
}

#[derive(Clone, Default)]
pub struct IdResolver {
    getter: Option<IdGetter>,
}

impl fmt::Debug for IdResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdResolver")
            .field("custom", &self.getter.is_some())
            .finish()
    }
}

impl IdResolver {
    pub fn new(getter: Option<IdGetter>) -> Self {
        Self { getter }
    }

    pub fn resolve(&self, host: &dyn GridHost, node: NodeId) -> Option<String> {
        if let Some(getter) = &self.getter
            && let Some(id) = getter(host, node).as_deref().and_then(normalize_id)
        {
            return Some(id);
        }
        ID_ATTRIBUTES
            .iter()
            .find_map(|name| host.attribute(node, name).as_deref().and_then(normalize_id))
    }

    /// Ids of the container's items in document order; items without an id
    /// are skipped.
    pub fn current_order(
        &self,
        host: &dyn GridHost,
        container: NodeId,
        item_selector: &str,
    ) -> Vec<String> {
        host.query_all(container, item_selector)
            .into_iter()
            .filter(|node| host.contains(container, *node))
            .filter_map(|node| self.resolve(host, node))
            .collect()
    }
}

/// Reorder the container's items to follow `ids`.
///
/// Unknown ids are ignored. Items missing from `ids` keep their relative
/// order and are placed after the listed ones. Returns the resulting order.
pub fn apply_order(
    host: &mut dyn GridHost,
    container: NodeId,
    ids: &[String],
    item_selector: &str,
    resolver: &IdResolver,
) -> Vec<String> {
    let items = host.query_all(container, item_selector);
    if items.is_empty() {
        return Vec::new();
    }

    let mut by_id: BTreeMap<String, NodeId> = BTreeMap::new();
    for node in &items {
        if let Some(id) = resolver.resolve(&*host, *node) {
            by_id.entry(id).or_insert(*node);
        }
    }

    let mut handled: BTreeSet<NodeId> = BTreeSet::new();
    let mut sequence: Vec<NodeId> = Vec::with_capacity(items.len());
    for id in ids.iter().filter_map(|id| normalize_id(id)) {
        let Some(node) = by_id.get(&id).copied() else {
            trace!(id = %id, "order id not present in container");
            continue;
        };
        if handled.insert(node) {
            sequence.push(node);
        }
    }
    sequence.extend(items.iter().copied().filter(|node| !handled.contains(node)));

    if sequence != items {
        for node in &sequence {
            if let Err(err) = host.insert_before(container, *node, None) {
                debug!(node = ?node, error = %err, "failed to move item");
            }
        }
    }

    resolver.current_order(&*host, container, item_selector)
}

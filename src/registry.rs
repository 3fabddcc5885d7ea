//! Several grids sharing one host.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::controller::{DraggableGrid, GridConfig};
use crate::host::{FrameHandle, GridHost, NodeId, PointerEvent};
use crate::store::OrderStore;

/// Controllers keyed by container. Configuring a container twice updates the
/// existing controller in place.
#[derive(Debug, Default)]
pub struct GridRegistry {
    grids: BTreeMap<NodeId, DraggableGrid>,
}

impl GridRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(
        &mut self,
        host: &mut dyn GridHost,
        store: Rc<dyn OrderStore>,
        config: GridConfig,
    ) -> Option<&mut DraggableGrid> {
        let container = config.container;
        if let Some(grid) = self.grids.get_mut(&container) {
            if let Err(err) = grid.configure(host, store, config) {
                debug!(container = ?container, error = %err, "reconfigure rejected");
            }
            return self.grids.get_mut(&container);
        }
        let grid = DraggableGrid::new(host, store, config)?;
        Some(self.grids.entry(container).or_insert(grid))
    }

    pub fn get(&self, container: NodeId) -> Option<&DraggableGrid> {
        self.grids.get(&container)
    }

    pub fn get_mut(&mut self, container: NodeId) -> Option<&mut DraggableGrid> {
        self.grids.get_mut(&container)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraggableGrid> {
        self.grids.values()
    }

    /// Offer `event` to every grid. Returns whether any consumed it.
    pub fn dispatch(&mut self, host: &mut dyn GridHost, event: &PointerEvent) -> bool {
        let mut consumed = false;
        for grid in self.grids.values_mut() {
            consumed |= grid.handle_event(host, event);
        }
        consumed
    }

    pub fn on_animation_frame(&mut self, host: &mut dyn GridHost, handle: FrameHandle) -> bool {
        self.grids
            .values_mut()
            .any(|grid| grid.on_animation_frame(host, handle))
    }

    /// Recompute placements of every grid, e.g. after a resize.
    pub fn reflow_all(&mut self, host: &mut dyn GridHost) {
        for grid in self.grids.values_mut() {
            grid.reflow(host);
        }
    }

    /// Destroy and forget the grid bound to `container`.
    pub fn destroy(&mut self, host: &mut dyn GridHost, container: NodeId) -> bool {
        match self.grids.remove(&container) {
            Some(mut grid) => grid.destroy(host),
            None => false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.grids.values().any(DraggableGrid::is_dragging)
    }

    /// Listener registrations still held across all grids.
    pub fn listener_count(&self) -> usize {
        self.grids.values().map(|grid| grid.listeners().len()).sum()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

//! In-memory [`GridHost`]: a board of tiles laid out on a fixed grid.
//!
//! The terminal demo renders it and the tests drive it. Every tile carries a
//! handle strip along its top edge and a small action button at the right end
//! of that strip. Containers lay their in-flow children out the way a CSS grid
//! with `grid-auto-flow: dense` would: explicit placements first, then the
//! rest packed first-fit in document order.

use std::collections::{BTreeMap, BTreeSet};

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::constants::PLACEHOLDER_CLASS;
use crate::geometry::Bounds;
use crate::host::{
    ContainerFlag, FrameHandle, GridHost, GridOverlay, HostError, NodeId, NodeStyle, PointerEvent,
    PointerPhase,
};
use crate::layout::{GridCell, Occupancy, pack_spans};

pub const TILE_CLASS: &str = "tile";
pub const HANDLE_CLASS: &str = "tile-handle";
pub const ACTION_CLASS: &str = "tile-action";
pub const WIDGET_ID_ATTRIBUTE: &str = "data-widget-id";

const ACTION_WIDTH: f64 = 2.0;

/// Grid geometry of one container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub origin: (f64, f64),
    pub width: f64,
    pub col_width: f64,
    pub row_height: f64,
    pub gap: f64,
    pub handle_height: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            origin: (0.0, 0.0),
            width: 320.0,
            col_width: 100.0,
            row_height: 80.0,
            gap: 10.0,
            handle_height: 1.0,
        }
    }
}

impl BoardGeometry {
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_cell(mut self, col_width: f64, row_height: f64, gap: f64) -> Self {
        self.col_width = col_width;
        self.row_height = row_height;
        self.gap = gap;
        self
    }

    pub fn columns(&self) -> usize {
        let step = self.col_width + self.gap;
        if step <= 0.0 {
            return 1;
        }
        let columns = ((self.width + self.gap) / step).floor();
        if columns.is_finite() && columns >= 1.0 {
            columns as usize
        } else {
            1
        }
    }

    fn step(&self) -> (f64, f64) {
        (self.col_width + self.gap, self.row_height + self.gap)
    }

    fn span_width(&self, span: usize) -> f64 {
        let span = span.max(1) as f64;
        span * self.col_width + (span - 1.0) * self.gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Document,
    Container,
    Tile,
    Handle,
    Action,
    Placeholder,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    span: Option<usize>,
    style: NodeStyle,
    geometry: Option<BoardGeometry>,
    removed: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            span: None,
            style: NodeStyle::default(),
            geometry: None,
            removed: false,
        }
    }

    fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    fn in_grid(&self) -> bool {
        matches!(self.kind, NodeKind::Tile | NodeKind::Placeholder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Any,
    Class(String),
    Id(String),
    Attr(String, Option<String>),
}

/// Compound selectors of a comma separated list. Descendant combinators are
/// not supported; a part containing whitespace matches nothing.
fn parse_selector(selector: &str) -> Vec<Vec<Simple>> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && !part.contains(char::is_whitespace))
        .filter_map(parse_compound)
        .collect()
}

fn parse_compound(part: &str) -> Option<Vec<Simple>> {
    let mut out = Vec::new();
    let mut rest = part;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('*') {
            out.push(Simple::Any);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('[') {
            let end = tail.find(']')?;
            let body = &tail[..end];
            let simple = match body.split_once('=') {
                Some((name, value)) => Simple::Attr(
                    name.trim().to_string(),
                    Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                ),
                None => Simple::Attr(body.trim().to_string(), None),
            };
            out.push(simple);
            rest = &tail[end + 1..];
        } else if let Some(tail) = rest.strip_prefix('.').or_else(|| rest.strip_prefix('#')) {
            let end = tail.find(['.', '#', '[', '*']).unwrap_or(tail.len());
            let name = tail[..end].to_string();
            if name.is_empty() {
                return None;
            }
            out.push(if rest.starts_with('.') {
                Simple::Class(name)
            } else {
                Simple::Id(name)
            });
            rest = &tail[end..];
        } else {
            return None;
        }
    }
    Some(out)
}

#[derive(Debug)]
pub struct TileBoard {
    nodes: Vec<Node>,
    containers: Vec<NodeId>,
    captures: BTreeMap<u32, NodeId>,
    capture_supported: bool,
    next_frame: u64,
    frames: Vec<FrameHandle>,
    cancelled_frames: BTreeSet<FrameHandle>,
    overlays: BTreeMap<NodeId, GridOverlay>,
    flags: BTreeSet<(NodeId, ContainerFlag)>,
    selection_suppressed: bool,
}

impl TileBoard {
    /// An empty document.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            containers: Vec::new(),
            captures: BTreeMap::new(),
            capture_supported: true,
            next_frame: 0,
            frames: Vec::new(),
            cancelled_frames: BTreeSet::new(),
            overlays: BTreeMap::new(),
            flags: BTreeSet::new(),
            selection_suppressed: false,
        }
    }

    /// One container with default geometry holding single-span tiles.
    pub fn with_tiles(ids: &[&str]) -> Self {
        let mut board = Self::new();
        let container = board.add_container(BoardGeometry::default());
        for id in ids {
            board.add_tile_to(container, id, 1);
        }
        board
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// First container added.
    pub fn root(&self) -> NodeId {
        self.containers.first().copied().unwrap_or(NodeId(0))
    }

    pub fn containers(&self) -> &[NodeId] {
        &self.containers
    }

    pub fn add_container(&mut self, geometry: BoardGeometry) -> NodeId {
        let mut node = Node::new(NodeKind::Container).with_class("grid");
        node.geometry = Some(geometry);
        let id = self.push(node, Some(self.document()));
        self.containers.push(id);
        id
    }

    pub fn add_tile(&mut self, id: &str, span: usize) -> NodeId {
        let container = self.root();
        self.add_tile_to(container, id, span)
    }

    pub fn add_tile_to(&mut self, container: NodeId, id: &str, span: usize) -> NodeId {
        let mut tile = Node::new(NodeKind::Tile)
            .with_class(TILE_CLASS)
            .with_attribute(WIDGET_ID_ATTRIBUTE, id)
            .with_attribute("title", id);
        tile.span = Some(span.max(1));
        let tile = self.push(tile, Some(container));
        let handle = self.push(Node::new(NodeKind::Handle).with_class(HANDLE_CLASS), Some(tile));
        self.push(
            Node::new(NodeKind::Action)
                .with_class(ACTION_CLASS)
                .with_attribute("data-action", "menu"),
            Some(handle),
        );
        tile
    }

    fn push(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        self.nodes.push(node);
        if let Some(parent) = parent
            && let Some(p) = self.node_mut(parent)
        {
            p.children.push(id);
        }
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).filter(|node| !node.removed)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .filter(|node| !node.removed)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn tile_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.containers
            .iter()
            .flat_map(|container| self.children(*container))
            .filter(|node| self.node(*node).is_some_and(|n| n.kind == NodeKind::Tile))
    }

    /// Tile carrying widget id `id`, in any container.
    pub fn tile(&self, id: &str) -> Option<NodeId> {
        self.tile_nodes()
            .find(|node| self.attribute(*node, WIDGET_ID_ATTRIBUTE).as_deref() == Some(id))
    }

    pub fn handle(&self, id: &str) -> Option<NodeId> {
        self.tile(id)
            .and_then(|tile| self.query_first(tile, &format!(".{HANDLE_CLASS}")))
    }

    pub fn action(&self, id: &str) -> Option<NodeId> {
        self.tile(id)
            .and_then(|tile| self.query_first(tile, &format!(".{ACTION_CLASS}")))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.remove(name);
        }
    }

    pub fn geometry(&self, container: NodeId) -> Option<BoardGeometry> {
        self.node(container).and_then(|n| n.geometry)
    }

    pub fn set_geometry(&mut self, container: NodeId, geometry: BoardGeometry) {
        if let Some(n) = self.node_mut(container) {
            n.geometry = Some(geometry);
        }
    }

    pub fn set_width(&mut self, container: NodeId, width: f64) {
        if let Some(geometry) = self.geometry(container) {
            self.set_geometry(container, geometry.with_width(width));
        }
    }

    pub fn set_capture_supported(&mut self, supported: bool) {
        self.capture_supported = supported;
    }

    pub fn capture_of(&self, pointer_id: u32) -> Option<NodeId> {
        self.captures.get(&pointer_id).copied()
    }

    /// Frames requested and not yet delivered or cancelled, oldest first.
    pub fn take_due_frames(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.frames)
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_frame_cancelled(&self, handle: FrameHandle) -> bool {
        self.cancelled_frames.contains(&handle)
    }

    pub fn overlay(&self, container: NodeId) -> Option<GridOverlay> {
        self.overlays.get(&container).copied()
    }

    pub fn selection_suppressed(&self) -> bool {
        self.selection_suppressed
    }

    /// Widget ids of the first container's tiles in document order.
    pub fn order_ids(&self) -> Vec<String> {
        self.order_ids_in(self.root())
    }

    pub fn order_ids_in(&self, container: NodeId) -> Vec<String> {
        self.children(container)
            .into_iter()
            .filter(|node| self.node(*node).is_some_and(|n| n.kind == NodeKind::Tile))
            .filter_map(|node| self.attribute(node, WIDGET_ID_ATTRIBUTE))
            .collect()
    }

    /// Placeholder nodes currently in the document.
    pub fn placeholders(&self) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| {
                self.node(*id)
                    .is_some_and(|n| n.kind == NodeKind::Placeholder && n.parent.is_some())
            })
            .collect()
    }

    pub fn is_placeholder(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.kind == NodeKind::Placeholder)
    }

    pub fn title(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "title")
    }

    fn container_of(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            if n.kind == NodeKind::Container {
                return Some(id);
            }
            current = n.parent;
        }
        None
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node(id) else {
                return false;
            };
            if n.kind == NodeKind::Document {
                return true;
            }
            current = n.parent;
        }
        false
    }

    fn preorder(&self, root: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.node(root) {
            for child in &node.children {
                out.push(*child);
                self.preorder(*child, out);
            }
        }
    }

    /// Settled cells of a container's in-flow children.
    fn layout(&self, container: NodeId) -> BTreeMap<NodeId, GridCell> {
        let mut cells = BTreeMap::new();
        let Some(geometry) = self.geometry(container) else {
            return cells;
        };
        let columns = geometry.columns();
        let mut occupancy = Occupancy::new(columns);
        let mut auto = Vec::new();
        for child in self.children(container) {
            let Some(node) = self.node(child) else {
                continue;
            };
            if !node.in_grid() || node.style.offset.is_some() {
                continue;
            }
            let span = node.span.unwrap_or(1).clamp(1, columns);
            match node.style.placement {
                Some(cell) => {
                    occupancy.claim(cell);
                    cells.insert(child, cell);
                }
                None => auto.push((child, span)),
            }
        }
        let spans: Vec<usize> = auto.iter().map(|(_, span)| *span).collect();
        if let Ok(placed) = pack_spans(&spans, &mut occupancy) {
            for ((node, _), cell) in auto.into_iter().zip(placed) {
                cells.insert(node, cell);
            }
        }
        cells
    }

    /// Rectangle of a tile or placeholder before its transform.
    fn settled_rect(&self, node: NodeId) -> Result<Bounds, HostError> {
        let n = self.node(node).ok_or(HostError::Detached(node))?;
        let container = self
            .container_of(node)
            .filter(|_| self.is_attached(node))
            .ok_or(HostError::GeometryUnavailable(node))?;
        let geometry = self
            .geometry(container)
            .ok_or(HostError::GeometryUnavailable(node))?;
        let (ox, oy) = geometry.origin;
        if let Some((dx, dy)) = n.style.offset {
            let (width, height) = n.style.size.unwrap_or((
                geometry.span_width(n.span.unwrap_or(1)),
                geometry.row_height,
            ));
            return Ok(Bounds::new(ox + dx, oy + dy, width, height));
        }
        let cell = self
            .layout(container)
            .get(&node)
            .copied()
            .ok_or(HostError::GeometryUnavailable(node))?;
        let (step_x, step_y) = geometry.step();
        Ok(Bounds::new(
            ox + cell.col as f64 * step_x,
            oy + cell.row as f64 * step_y,
            geometry.span_width(cell.span),
            geometry.row_height,
        ))
    }

    fn z_index(&self, node: NodeId) -> i32 {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node(id) else {
                break;
            };
            if let Some(z) = n.style.z_index {
                return z;
            }
            current = n.parent;
        }
        0
    }

    fn pointer_events_disabled(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node(id) else {
                return true;
            };
            if n.style.pointer_events_disabled {
                return true;
            }
            current = n.parent;
        }
        false
    }

    /// Topmost node under (`x`, `y`) that accepts pointer events.
    pub fn node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        let mut all = Vec::new();
        self.preorder(self.document(), &mut all);
        all.into_iter()
            .enumerate()
            .filter(|(_, node)| !self.pointer_events_disabled(*node))
            .filter(|(_, node)| {
                self.bounding_rect(*node)
                    .is_ok_and(|rect| rect.contains(x, y))
            })
            .max_by_key(|(order, node)| (self.z_index(*node), *order))
            .map(|(_, node)| node)
    }

    /// Translate a terminal mouse event into a pointer event aimed at the
    /// cell's center.
    pub fn pointer_from_mouse(&self, mouse: MouseEvent) -> Option<PointerEvent> {
        let x = mouse.column as f64 + 0.5;
        let y = mouse.row as f64 + 0.5;
        let button = |b: MouseButton| match b {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        };
        let event = match mouse.kind {
            MouseEventKind::Down(b) => PointerEvent::new(PointerPhase::Down, x, y, self.node_at(x, y))
                .with_button(button(b)),
            MouseEventKind::Drag(_) | MouseEventKind::Moved => PointerEvent::moved(x, y),
            MouseEventKind::Up(b) => PointerEvent::up(x, y).with_button(button(b)),
            _ => return None,
        };
        Some(event)
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.node(node).and_then(|n| n.parent);
        if let Some(parent) = parent
            && let Some(p) = self.node_mut(parent)
        {
            p.children.retain(|child| *child != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &[Simple]) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        compound.iter().all(|simple| match simple {
            Simple::Any => true,
            Simple::Class(class) => n.classes.iter().any(|c| c == class),
            Simple::Id(id) => n.attributes.get("id") == Some(id),
            Simple::Attr(name, None) => n.attributes.contains_key(name),
            Simple::Attr(name, Some(value)) => n.attributes.get(name) == Some(value),
        })
    }
}

impl Default for TileBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl GridHost for TileBoard {
    fn query_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let parsed = parse_selector(selector);
        let mut all = Vec::new();
        self.preorder(root, &mut all);
        all.into_iter()
            .filter(|node| parsed.iter().any(|c| self.matches_compound(*node, c)))
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        parse_selector(selector)
            .iter()
            .any(|compound| self.matches_compound(node, compound))
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let parsed = parse_selector(selector);
        let mut current = Some(node);
        while let Some(id) = current {
            if parsed.iter().any(|c| self.matches_compound(id, c)) {
                return Some(id);
            }
            current = self.node(id)?.parent;
        }
        None
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent);
        }
        false
    }

    fn within_interactive(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.node(id) else {
                return false;
            };
            if n.kind == NodeKind::Action
                || n.attributes.contains_key("data-action")
                || n.attributes.get("role").is_some_and(|role| role == "button")
            {
                return true;
            }
            current = n.parent;
        }
        false
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let n = self.node(node)?;
        if name == "class" {
            return Some(n.classes.join(" "));
        }
        n.attributes.get(name).cloned()
    }

    fn declared_span(&self, node: NodeId) -> Option<usize> {
        self.node(node).and_then(|n| n.span)
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Bounds, HostError> {
        let n = self.node(node).ok_or(HostError::Detached(node))?;
        let rect = match n.kind {
            NodeKind::Document => return Err(HostError::GeometryUnavailable(node)),
            NodeKind::Container => {
                let geometry = n.geometry.ok_or(HostError::GeometryUnavailable(node))?;
                let rows = self
                    .layout(node)
                    .values()
                    .map(|cell| cell.row + 1)
                    .max()
                    .unwrap_or(0);
                let height = (rows as f64 * geometry.step().1 - geometry.gap).max(0.0);
                return Ok(Bounds::new(
                    geometry.origin.0,
                    geometry.origin.1,
                    geometry.width,
                    height,
                ));
            }
            NodeKind::Tile | NodeKind::Placeholder => self.settled_rect(node)?,
            NodeKind::Handle => {
                let tile = n.parent.ok_or(HostError::GeometryUnavailable(node))?;
                let rect = self.bounding_rect(tile)?;
                let height = self
                    .container_of(tile)
                    .and_then(|c| self.geometry(c))
                    .map_or(1.0, |g| g.handle_height)
                    .min(rect.height);
                return Ok(Bounds::new(rect.left, rect.top, rect.width, height));
            }
            NodeKind::Action => {
                let handle = n.parent.ok_or(HostError::GeometryUnavailable(node))?;
                let strip = self.bounding_rect(handle)?;
                let width = ACTION_WIDTH.min(strip.width);
                return Ok(Bounds::new(strip.right() - width, strip.top, width, strip.height));
            }
        };
        Ok(match n.style.transform {
            Some((dx, dy)) => rect.translate(dx, dy),
            None => rect,
        })
    }

    fn inferred_gap(&self, node: NodeId) -> Option<f64> {
        self.container_of(node)
            .and_then(|c| self.geometry(c))
            .map(|g| g.gap)
    }

    fn style(&self, node: NodeId) -> NodeStyle {
        self.node(node).map(|n| n.style).unwrap_or_default()
    }

    fn set_style(&mut self, node: NodeId, style: NodeStyle) {
        if let Some(n) = self.node_mut(node) {
            n.style = style;
        }
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), HostError> {
        if self.node(parent).is_none() {
            return Err(HostError::Detached(parent));
        }
        if self.node(node).is_none() {
            return Err(HostError::Detached(node));
        }
        if before == Some(node) {
            return Ok(());
        }
        if let Some(before) = before
            && self.node(before).and_then(|n| n.parent) != Some(parent)
        {
            return Err(HostError::NotAChild {
                parent,
                node: before,
            });
        }
        self.detach(node);
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            let at = before
                .and_then(|b| p.children.iter().position(|child| *child == b))
                .unwrap_or(p.children.len());
            p.children.insert(at, node);
        }
        Ok(())
    }

    fn create_placeholder(&mut self, template: NodeId) -> NodeId {
        let mut node = Node::new(NodeKind::Placeholder)
            .with_class(PLACEHOLDER_CLASS)
            .with_attribute("data-qa", "dnd-placeholder")
            .with_attribute("aria-hidden", "true");
        node.span = self.declared_span(template);
        self.push(node, None)
    }

    fn remove_node(&mut self, node: NodeId) {
        self.detach(node);
        let mut doomed = vec![node];
        self.preorder(node, &mut doomed);
        for id in doomed {
            if let Some(n) = self.nodes.get_mut(id.0 as usize) {
                n.removed = true;
            }
        }
        self.captures.retain(|_, captured| *captured != node);
    }

    fn set_pointer_capture(&mut self, node: NodeId, pointer_id: u32) -> Result<(), HostError> {
        if !self.capture_supported {
            return Err(HostError::CaptureUnsupported);
        }
        if !self.is_attached(node) {
            return Err(HostError::CaptureRejected(pointer_id));
        }
        self.captures.insert(pointer_id, node);
        Ok(())
    }

    fn release_pointer_capture(&mut self, node: NodeId, pointer_id: u32) {
        if self.captures.get(&pointer_id) == Some(&node) {
            self.captures.remove(&pointer_id);
        }
    }

    fn request_animation_frame(&mut self) -> FrameHandle {
        self.next_frame += 1;
        let handle = FrameHandle(self.next_frame);
        self.frames.push(handle);
        handle
    }

    fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|frame| *frame != handle);
        self.cancelled_frames.insert(handle);
    }

    fn set_overlay(&mut self, container: NodeId, overlay: Option<GridOverlay>) {
        match overlay {
            Some(overlay) => self.overlays.insert(container, overlay),
            None => self.overlays.remove(&container),
        };
    }

    fn set_container_flag(&mut self, container: NodeId, flag: ContainerFlag, on: bool) {
        if on {
            self.flags.insert((container, flag));
        } else {
            self.flags.remove(&(container, flag));
        }
    }

    fn container_flag(&self, container: NodeId, flag: ContainerFlag) -> bool {
        self.flags.contains(&(container, flag))
    }

    fn set_selection_suppressed(&mut self, suppressed: bool) {
        self.selection_suppressed = suppressed;
    }
}

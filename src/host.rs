//! The environment a draggable grid lives in.
//!
//! `GridHost` is the narrow slice of a document model the drag engine needs:
//! selector queries, bounding rectangles, a typed inline style, node moves,
//! pointer capture and animation-frame scheduling. The engine never owns the
//! host; every controller call borrows it, so several containers can share
//! one document.

use thiserror::Error;

use crate::geometry::Bounds;
use crate::layout::GridCell;

/// Opaque handle to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Handle returned by [`GridHost::request_animation_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("node {0:?} has no layout box")]
    GeometryUnavailable(NodeId),
    #[error("node {0:?} is not attached to the document")]
    Detached(NodeId),
    #[error("node {node:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, node: NodeId },
    #[error("pointer capture is not supported")]
    CaptureUnsupported,
    #[error("pointer capture rejected for pointer {0}")]
    CaptureRejected(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Pointer input in host coordinates. `button` 0 is the primary button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub pointer_id: u32,
    pub kind: PointerKind,
    pub button: u16,
    pub x: f64,
    pub y: f64,
    pub target: Option<NodeId>,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f64, y: f64, target: Option<NodeId>) -> Self {
        Self {
            phase,
            pointer_id: 1,
            kind: PointerKind::Mouse,
            button: 0,
            x,
            y,
            target,
        }
    }

    pub fn down(x: f64, y: f64, target: NodeId) -> Self {
        Self::new(PointerPhase::Down, x, y, Some(target))
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, x, y, None)
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Up, x, y, None)
    }

    pub fn cancel() -> Self {
        Self::new(PointerPhase::Cancel, 0.0, 0.0, None)
    }

    pub fn with_pointer(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }

    pub fn with_kind(mut self, kind: PointerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    pub fn with_target(mut self, target: Option<NodeId>) -> Self {
        self.target = target;
        self
    }

    /// Primary button for mice; touch and pen contacts always qualify.
    pub fn is_primary(&self) -> bool {
        match self.kind {
            PointerKind::Touch | PointerKind::Pen => true,
            PointerKind::Mouse => self.button == 0,
        }
    }
}

/// Inline style properties the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeStyle {
    /// Absolute position relative to the container origin. `None` keeps the
    /// node in grid flow.
    pub offset: Option<(f64, f64)>,
    pub size: Option<(f64, f64)>,
    pub transform: Option<(f64, f64)>,
    pub transition_suppressed: bool,
    pub opacity: Option<f32>,
    pub z_index: Option<i32>,
    pub pointer_events_disabled: bool,
    /// Explicit grid placement; `None` lets the host auto-place.
    pub placement: Option<GridCell>,
}

/// Gridline overlay description pushed to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOverlay {
    pub step_x: f64,
    pub step_y: f64,
    pub gap: f64,
    pub columns: usize,
    pub dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerFlag {
    Bound,
    Dragging,
    GridlinesVisible,
}

pub trait GridHost {
    /// Descendants of `root` matching `selector`, in document order.
    fn query_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;
    /// First descendant of `root` matching `selector`.
    fn query_first(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        self.query_all(root, selector).into_iter().next()
    }
    fn matches(&self, node: NodeId, selector: &str) -> bool;
    /// `node` itself or its nearest ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Inclusive: a node contains itself.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;
    /// True when `node` is, or sits inside, a control that owns its own
    /// pointer interaction (buttons, links, inputs).
    fn within_interactive(&self, node: NodeId) -> bool;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    /// Column span the data layer declared for `node`, if any.
    fn declared_span(&self, node: NodeId) -> Option<usize>;

    fn bounding_rect(&self, node: NodeId) -> Result<Bounds, HostError>;
    /// Spacing the host can infer around `node` (margins, grid gap).
    fn inferred_gap(&self, _node: NodeId) -> Option<f64> {
        None
    }

    fn style(&self, node: NodeId) -> NodeStyle;
    fn set_style(&mut self, node: NodeId, style: NodeStyle);
    /// Move `node` under `parent`, before `before` or at the end.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), HostError>;
    /// Create a detached placeholder shaped after `template`.
    fn create_placeholder(&mut self, template: NodeId) -> NodeId;
    fn remove_node(&mut self, node: NodeId);

    fn set_pointer_capture(&mut self, node: NodeId, pointer_id: u32) -> Result<(), HostError>;
    fn release_pointer_capture(&mut self, node: NodeId, pointer_id: u32);

    fn request_animation_frame(&mut self) -> FrameHandle;
    fn cancel_animation_frame(&mut self, handle: FrameHandle);

    fn set_overlay(&mut self, _container: NodeId, _overlay: Option<GridOverlay>) {}
    fn set_container_flag(&mut self, _container: NodeId, _flag: ContainerFlag, _on: bool) {}
    fn container_flag(&self, _container: NodeId, _flag: ContainerFlag) -> bool {
        false
    }
    fn set_selection_suppressed(&mut self, _suppressed: bool) {}
}

/// Split a comma separated selector list, dropping empty parts.
pub fn parse_selectors(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

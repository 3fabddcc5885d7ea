//! Shared crate-wide constants.

/// Distance (logical units, either axis) a pressed pointer must travel before
/// a pending session is promoted to a drag.
pub const DRAG_DISTANCE_THRESHOLD: f64 = 5.0;

/// Displacements smaller than this on both axes are not animated by reflow.
pub const REFLOW_EPSILON: f64 = 0.5;

/// Gap used when neither the options nor the host can supply one.
pub const DEFAULT_GAP: f64 = 16.0;

/// How many columns past the last valid start column a spanning placeholder
/// may overshoot before it is pushed to the next row instead of pulled back.
pub const SPAN_SNAP_TOLERANCE: usize = 2;

/// Stacking order of the detached item while it follows the pointer.
pub const DRAG_Z_INDEX: i32 = 50;

/// Opacity of the detached item while it follows the pointer.
pub const DRAG_OPACITY: f32 = 0.72;

/// Separator between ids in an order signature.
pub const SIGNATURE_SEPARATOR: &str = "|";

/// Attributes consulted, in order, when no id getter yields an id.
pub const ID_ATTRIBUTES: [&str; 4] = ["data-widget-id", "data-id", "data-key", "id"];

/// Class given to the placeholder node.
pub const PLACEHOLDER_CLASS: &str = "dash-drag-placeholder";

/// Selector matching the placeholder node in any host.
pub const PLACEHOLDER_SELECTOR: &str = "[data-qa=\"dnd-placeholder\"]";

/// Listener tags used in the registration table.
pub const TAG_POINTER_DOWN: &str = "drag-core:pointerdown";
pub const TAG_PENDING: &str = "drag-core:pending";
pub const TAG_ACTIVE: &str = "drag-core:active";

//! Drag-and-drop reordering for dashboard grids.
//!
//! A [`DraggableGrid`] turns the items of one container into draggable tiles:
//! a press on an item's handle starts a pending session, moving past a small
//! threshold lifts the item, and a placeholder tracks the drop slot while the
//! other items are packed around it. Releasing commits the new order to an
//! [`OrderStore`]; cancelling puts everything back.
//!
//! The engine talks to its document through [`GridHost`]. [`TileBoard`] is an
//! in-memory host used by the terminal demo and the tests.

pub mod board;
pub mod constants;
pub mod controller;
pub mod debug;
pub mod debug_log;
pub mod drag;
pub mod drivers;
pub mod event_loop;
pub mod geometry;
pub mod host;
pub mod layout;
pub mod listeners;
pub mod meta;
pub mod order;
pub mod placeholder;
pub mod registry;
pub mod store;
pub mod tracing_sub;
pub mod ui;

pub use board::TileBoard;
pub use controller::{ConfigError, DraggableGrid, GridConfig};
pub use host::{GridHost, NodeId, PointerEvent};
pub use layout::{GridMetrics, GridOptions, OccupancyPlan};
pub use registry::GridRegistry;
pub use store::{FileStore, MemoryStore, OrderStore};

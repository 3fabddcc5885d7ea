//! Test observability.
//!
//! `DebugSnapshot` is the process-wide state external tests poll (column
//! count, widget order, drag counters). It is written to and never read by
//! control flow. `Diagnostics` is the per-controller counterpart.

use std::sync::{Mutex, OnceLock};

use serde::Serialize;

static DEBUG_STATE: OnceLock<Mutex<DebugSnapshot>> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub columns: usize,
    pub widgets: Vec<String>,
    pub drag_starts: u64,
    pub drag_ends: u64,
    pub swaps: u64,
    pub resized: u64,
    pub today_mode: bool,
    pub selected_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    DragStarts,
    DragEnds,
    Swaps,
    Resized,
}

fn with_state(f: impl FnOnce(&mut DebugSnapshot)) {
    let state = DEBUG_STATE.get_or_init(|| Mutex::new(DebugSnapshot::default()));
    if let Ok(mut guard) = state.lock() {
        f(&mut guard);
    }
}

pub fn record_columns(columns: usize) {
    with_state(|s| s.columns = columns);
}

pub fn record_widgets(ids: &[String]) {
    with_state(|s| s.widgets = ids.to_vec());
}

pub fn bump(counter: Counter) {
    with_state(|s| match counter {
        Counter::DragStarts => s.drag_starts += 1,
        Counter::DragEnds => s.drag_ends += 1,
        Counter::Swaps => s.swaps += 1,
        Counter::Resized => s.resized += 1,
    });
}

pub fn set_today_mode(on: bool) {
    with_state(|s| s.today_mode = on);
}

pub fn set_selected_ids(ids: &[String]) {
    with_state(|s| s.selected_ids = ids.to_vec());
}

pub fn debug_snapshot() -> DebugSnapshot {
    let mut out = DebugSnapshot::default();
    with_state(|s| out = s.clone());
    out
}

/// Snapshot as a JSON string, for log lines.
pub fn debug_snapshot_json() -> String {
    serde_json::to_string(&debug_snapshot()).unwrap_or_default()
}

/// Counters owned by one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub drag_starts: u64,
    pub drag_ends: u64,
    pub drag_cancels: u64,
    pub swaps: u64,
    pub persisted_writes: u64,
    pub listeners_active: usize,
    pub listeners_attached_total: u64,
}

//! Simulated desktop backend.
//!
//! Implements the platform capability traits against an in-memory
//! [`SyntheticTree`]. Pointer operations are recorded rather than
//! injected, which is what session tests and the demo assert against.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use clickless_core::tree::synthetic::{node, SyntheticTree};
use clickless_core::tree::NodeHandle;
use tracing::debug;

use crate::platform::{Accessibility, Pointer, ProcessId};

/// A recorded pointer operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOp {
    Click(f64, f64),
    RightClick(f64, f64),
    MiddleClick(f64, f64),
    Scroll(f64, f64),
    MoveTo(f64, f64),
}

/// In-memory desktop: one foreground application with a synthetic tree,
/// a trust flag, and a recorded pointer.
pub struct SyntheticDesktop {
    tree: SyntheticTree,
    trusted: AtomicBool,
    trust_requested: AtomicBool,
    foreground: Mutex<Option<ProcessId>>,
    cursor: Mutex<(f64, f64)>,
    ops: Mutex<Vec<PointerOp>>,
}

impl SyntheticDesktop {
    #[must_use]
    pub fn new(tree: SyntheticTree) -> Self {
        Self {
            tree,
            trusted: AtomicBool::new(true),
            trust_requested: AtomicBool::new(false),
            foreground: Mutex::new(Some(1)),
            cursor: Mutex::new((400.0, 300.0)),
            ops: Mutex::new(Vec::new()),
        }
    }

    /// A small sample application for the demo: a toolbar, a couple of
    /// buttons, and a search field.
    #[must_use]
    pub fn sample() -> Self {
        let root = node("window", "Sample App")
            .frame(0.0, 0.0, 1024.0, 768.0)
            .child(
                node("group", "toolbar")
                    .frame(0.0, 0.0, 1024.0, 40.0)
                    .child(node("toolbar-button", "Back").frame(8.0, 6.0, 60.0, 28.0))
                    .child(node("toolbar-button", "Forward").frame(76.0, 6.0, 60.0, 28.0))
                    .child(node("text-field", "Search").frame(144.0, 6.0, 300.0, 28.0)),
            )
            .child(node("button", "Save").frame(20.0, 700.0, 90.0, 30.0))
            .child(node("button", "Cancel").frame(120.0, 700.0, 90.0, 30.0))
            .child(node("link", "Help").frame(900.0, 700.0, 60.0, 24.0));
        Self::new(SyntheticTree::new(root))
    }

    #[must_use]
    pub fn tree(&self) -> &SyntheticTree {
        &self.tree
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.trusted.store(trusted, Ordering::SeqCst);
    }

    #[must_use]
    pub fn trust_requested(&self) -> bool {
        self.trust_requested.load(Ordering::SeqCst)
    }

    pub fn set_foreground(&self, pid: Option<ProcessId>) {
        *self.foreground.lock().expect("foreground") = pid;
    }

    pub fn set_cursor(&self, x: f64, y: f64) {
        *self.cursor.lock().expect("cursor") = (x, y);
    }

    #[must_use]
    pub fn pointer_ops(&self) -> Vec<PointerOp> {
        self.ops.lock().expect("pointer ops").clone()
    }

    fn record(&self, op: PointerOp) {
        debug!(?op, "pointer");
        self.ops.lock().expect("pointer ops").push(op);
    }
}

impl Accessibility for SyntheticDesktop {
    fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }

    fn request_trust(&self) {
        self.trust_requested.store(true, Ordering::SeqCst);
    }

    fn foreground_process(&self) -> Option<ProcessId> {
        *self.foreground.lock().expect("foreground")
    }

    fn tree_root(&self, _pid: ProcessId) -> Option<NodeHandle> {
        Some(self.tree.root_handle())
    }
}

impl Pointer for SyntheticDesktop {
    fn click(&self, x: f64, y: f64) {
        self.record(PointerOp::Click(x, y));
    }

    fn right_click(&self, x: f64, y: f64) {
        self.record(PointerOp::RightClick(x, y));
    }

    fn middle_click(&self, x: f64, y: f64) {
        self.record(PointerOp::MiddleClick(x, y));
    }

    fn scroll(&self, dx: f64, dy: f64) {
        self.record(PointerOp::Scroll(dx, dy));
    }

    fn move_cursor_to(&self, x: f64, y: f64) {
        *self.cursor.lock().expect("cursor") = (x, y);
        self.record(PointerOp::MoveTo(x, y));
    }

    fn cursor_position(&self) -> (f64, f64) {
        *self.cursor.lock().expect("cursor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickless_core::tree::scan::{scan, ScanBudget};

    #[test]
    fn sample_desktop_scans_to_labeled_elements() {
        let desktop = SyntheticDesktop::sample();
        let root = desktop.tree_root(1).expect("root");
        let snap = scan(root, &ScanBudget::default());

        let names: Vec<&str> = snap.iter().map(|e| e.display_name()).collect();
        assert_eq!(
            names,
            ["Back", "Forward", "Search", "Save", "Cancel", "Help"]
        );
    }

    #[test]
    fn pointer_ops_are_recorded_in_order() {
        let desktop = SyntheticDesktop::sample();
        desktop.click(1.0, 2.0);
        desktop.scroll(0.0, 50.0);
        assert_eq!(
            desktop.pointer_ops(),
            vec![PointerOp::Click(1.0, 2.0), PointerOp::Scroll(0.0, 50.0)]
        );
    }

    #[test]
    fn move_cursor_updates_position() {
        let desktop = SyntheticDesktop::sample();
        desktop.move_cursor_to(10.0, 20.0);
        assert_eq!(desktop.cursor_position(), (10.0, 20.0));
    }

    #[test]
    fn foreground_can_be_cleared() {
        let desktop = SyntheticDesktop::sample();
        assert!(desktop.foreground_process().is_some());
        desktop.set_foreground(None);
        assert!(desktop.foreground_process().is_none());
    }
}

//! Platform capability seams.
//!
//! The session controller never touches the OS directly; it consumes these
//! traits. A real desktop adapter implements them against the platform's
//! accessibility and event-injection APIs. The built-in
//! [`synthetic::SyntheticDesktop`] implements them against an in-memory
//! tree and is what tests and the demo run on.

pub mod synthetic;

use clickless_core::snapshot::ElementSummary;
use clickless_core::tree::NodeHandle;
use tracing::{debug, info};

/// Identifier of a foreground process, as reported by the platform.
pub type ProcessId = i32;

/// Accessibility-side capabilities: the trust gate, foreground lookup,
/// and tree access. All calls are synchronous and best-effort.
pub trait Accessibility: Send + Sync {
    fn is_trusted(&self) -> bool;

    /// Ask the platform to prompt the user for trust. Idempotent.
    fn request_trust(&self);

    fn foreground_process(&self) -> Option<ProcessId>;

    /// Retain a handle on the application's tree root, if the process
    /// still exists and exposes a tree.
    fn tree_root(&self, pid: ProcessId) -> Option<NodeHandle>;
}

/// Pointer-injection capabilities. Best-effort, fire-and-forget.
pub trait Pointer: Send + Sync {
    fn click(&self, x: f64, y: f64);
    fn right_click(&self, x: f64, y: f64);
    fn middle_click(&self, x: f64, y: f64);
    fn scroll(&self, dx: f64, dy: f64);
    fn move_cursor_to(&self, x: f64, y: f64);
    fn cursor_position(&self) -> (f64, f64);
}

/// The overlay renderer, treated as a pure view: it consumes snapshot
/// summaries and the typed-prefix state, and produces pixels elsewhere.
pub trait OverlayView: Send + Sync {
    /// Present labels for a fresh snapshot.
    fn show(&self, summaries: &[ElementSummary]);

    /// Narrow the visible labels to the candidates for the typed prefix.
    fn narrow(&self, prefix: &str, candidates: &[usize]);

    /// Remove the overlay.
    fn hide(&self);
}

/// Overlay stub that reports through tracing instead of drawing.
#[derive(Debug, Default)]
pub struct TracingOverlay;

impl OverlayView for TracingOverlay {
    fn show(&self, summaries: &[ElementSummary]) {
        info!(elements = summaries.len(), "overlay shown");
    }

    fn narrow(&self, prefix: &str, candidates: &[usize]) {
        debug!(prefix, candidates = candidates.len(), "overlay narrowed");
    }

    fn hide(&self) {
        info!("overlay hidden");
    }
}

/// Overlay stub that dumps snapshot summaries as JSON lines on stdout,
/// used by the demo command.
#[derive(Debug, Default)]
pub struct JsonOverlay;

impl OverlayView for JsonOverlay {
    fn show(&self, summaries: &[ElementSummary]) {
        match serde_json::to_string_pretty(summaries) {
            Ok(json) => println!("{json}"),
            Err(e) => debug!("failed to serialize summaries: {e}"),
        }
    }

    fn narrow(&self, prefix: &str, candidates: &[usize]) {
        println!("prefix {prefix:?} -> {candidates:?}");
    }

    fn hide(&self) {
        println!("overlay hidden");
    }
}

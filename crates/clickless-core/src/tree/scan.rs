//! Depth- and time-bounded discovery of clickable elements.
//!
//! The scanner walks an application's UI tree in pre-order (parent first,
//! children in native sibling order) and collects every node that passes
//! the clickable/enabled/visible filters, up to a hard element cap. The
//! walk carries an explicit deadline: running out of time is a soft stop
//! that returns whatever was accumulated, never an error. The resulting
//! order is significant: it is the index space labels are assigned over.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crate::snapshot::{ElementSnapshot, UiElement};
use crate::tree::{NodeHandle, Rect, Role, UiNode};

/// Minimum on-screen extent, in pixels, for an element to be collectable.
pub const MIN_VISIBLE_SIZE: f64 = 5.0;

/// Bounds for one scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBudget {
    /// Wall-clock budget for the whole walk.
    pub time_budget: Duration,
    /// Maximum recursion depth below the root.
    pub max_depth: usize,
    /// Per-snapshot element cap.
    pub max_elements: usize,
}

impl Default for ScanBudget {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_millis(500),
            max_depth: 10,
            max_elements: 500,
        }
    }
}

/// Scan the tree under `root`, stopping at `budget`'s limits.
///
/// The deadline starts now; see [`scan_until`] for an injected deadline.
#[must_use]
pub fn scan(root: NodeHandle, budget: &ScanBudget) -> ElementSnapshot {
    scan_until(root, budget, Instant::now() + budget.time_budget)
}

/// Scan with an explicit deadline instead of an ambient clock.
///
/// Checked before visiting each node and before descending into each
/// child. On expiry the walk aborts where it stands: collected elements
/// are returned, unvisited subtrees are skipped, and every handle that
/// was retained but not collected is released on the way out.
#[must_use]
pub fn scan_until(root: NodeHandle, budget: &ScanBudget, deadline: Instant) -> ElementSnapshot {
    let mut walk = Walk {
        budget,
        deadline,
        elements: Vec::new(),
        deadline_hit: false,
    };
    let _ = walk.visit(root, 0);
    ElementSnapshot::new(walk.elements, walk.deadline_hit)
}

struct Walk<'a> {
    budget: &'a ScanBudget,
    deadline: Instant,
    elements: Vec<UiElement>,
    deadline_hit: bool,
}

impl Walk<'_> {
    fn visit(&mut self, node: NodeHandle, depth: usize) -> ControlFlow<()> {
        if self.expired() {
            // `node` drops here, releasing its retention.
            return ControlFlow::Break(());
        }

        // Best-effort attribute reads; a refusing node contributes nothing
        // but its children are still walked.
        let role = node
            .role()
            .map_or(Role::Unknown, |name| Role::parse(&name));
        let frame = node.frame();
        let enabled = node.enabled().unwrap_or(true);

        // Children must be retained before the node handle can move into
        // an element.
        let children = if depth < self.budget.max_depth {
            node.children()
        } else {
            Vec::new()
        };

        if self.elements.len() < self.budget.max_elements
            && enabled
            && role.is_clickable()
            && frame.is_some_and(collectable)
        {
            let name = display_name(&*node, role);
            self.elements
                .push(UiElement::new(role, name, frame.unwrap_or_default(), node));
        }

        for child in children {
            if self.elements.len() >= self.budget.max_elements {
                // Remaining children drop unvisited.
                return ControlFlow::Break(());
            }
            if self.expired() {
                return ControlFlow::Break(());
            }
            self.visit(child, depth + 1)?;
        }
        ControlFlow::Continue(())
    }

    fn expired(&mut self) -> bool {
        if Instant::now() >= self.deadline {
            self.deadline_hit = true;
        }
        self.deadline_hit
    }
}

/// Visibility filter: strictly positive extent above the minimum size,
/// non-negative origin.
fn collectable(frame: Rect) -> bool {
    frame.width > MIN_VISIBLE_SIZE
        && frame.height > MIN_VISIBLE_SIZE
        && frame.x >= 0.0
        && frame.y >= 0.0
}

/// Title, falling back to description, falling back to the role name.
fn display_name(node: &dyn UiNode, role: Role) -> String {
    node.title()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| node.description().filter(|d| !d.trim().is_empty()))
        .unwrap_or_else(|| role.name().to_string())
}

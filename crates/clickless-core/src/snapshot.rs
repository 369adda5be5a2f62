//! Element snapshots: the ordered result of one scan pass.
//!
//! A snapshot owns every element it contains, and each element owns the
//! retained handle it was discovered with. Dropping a snapshot therefore
//! releases every handle exactly once; replacement on rescan and teardown
//! on hide are both just drops.
//!
//! Snapshot order is discovery order (pre-order walk) and doubles as the
//! label index space: `labels::label(i)` names the element at index `i`.

use serde::Serialize;
use unicode_width::UnicodeWidthChar;

use crate::fuzzy;
use crate::labels;
use crate::tree::{Activation, NodeHandle, Rect, Role};

/// Display names are bounded to this many display columns.
pub const MAX_DISPLAY_COLS: usize = 80;

/// One discovered actionable element.
///
/// The activation handle is private and exclusively owned: nothing outside
/// the element can clone or outlive it, and it is released when the element
/// (with its snapshot) is dropped.
pub struct UiElement {
    role: Role,
    display_name: String,
    frame: Rect,
    handle: NodeHandle,
}

impl UiElement {
    pub(crate) fn new(role: Role, display_name: String, frame: Rect, handle: NodeHandle) -> Self {
        Self {
            role,
            display_name: clamp_display_cols(&display_name, MAX_DISPLAY_COLS),
            frame,
            handle,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Title, or fallback description, or role name. Used for fuzzy
    /// filtering only, never for label assignment.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Invoke the bound activation capability: press for most roles, a
    /// focus request for text-input-like ones. Returns false when the
    /// underlying node has vanished.
    #[must_use]
    pub fn activate(&self) -> bool {
        let how = if self.role.prefers_focus() {
            Activation::Focus
        } else {
            Activation::Press
        };
        self.handle.activate(how)
    }
}

impl std::fmt::Debug for UiElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiElement")
            .field("role", &self.role)
            .field("display_name", &self.display_name)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// Serializable view of one element, for the overlay and the demo dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSummary {
    pub label: String,
    pub role: Role,
    pub name: String,
    pub frame: Rect,
}

/// Result of matching a typed prefix against the snapshot's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    /// The prefix equals the label at this index.
    Exact(usize),
    /// At least one label has the prefix as a strict prefix; keep typing.
    Partial,
    /// No label starts with the prefix; the typed sequence is abandoned.
    NoMatch,
}

/// Ordered collection of elements from one scan pass.
///
/// Owned exclusively by the active session and replaced wholesale on
/// rescan.
#[derive(Debug, Default)]
pub struct ElementSnapshot {
    elements: Vec<UiElement>,
    deadline_hit: bool,
}

impl ElementSnapshot {
    pub(crate) fn new(elements: Vec<UiElement>, deadline_hit: bool) -> Self {
        Self {
            elements,
            deadline_hit,
        }
    }

    /// Snapshot with no elements, used when there is no foreground target.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True when the scan ran out of time and returned a partial walk.
    #[must_use]
    pub fn deadline_hit(&self) -> bool {
        self.deadline_hit
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&UiElement> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UiElement> {
        self.elements.iter()
    }

    /// Match a typed prefix against generated labels, in index order.
    ///
    /// The first index whose label equals the prefix wins immediately.
    /// Otherwise the prefix either still narrows ([`LabelMatch::Partial`])
    /// or matches nothing at all.
    #[must_use]
    pub fn match_prefix(&self, prefix: &str) -> LabelMatch {
        let mut any_partial = false;
        for i in 0..self.elements.len() {
            let label = labels::label(i);
            if label == prefix {
                return LabelMatch::Exact(i);
            }
            if label.starts_with(prefix) {
                any_partial = true;
            }
        }
        if any_partial {
            LabelMatch::Partial
        } else {
            LabelMatch::NoMatch
        }
    }

    /// First index whose label starts with `prefix`, if any.
    #[must_use]
    pub fn first_prefix_match(&self, prefix: &str) -> Option<usize> {
        (0..self.elements.len()).find(|&i| labels::label(i).starts_with(prefix))
    }

    /// Every index whose label starts with `prefix`, for overlay narrowing.
    #[must_use]
    pub fn prefix_candidates(&self, prefix: &str) -> Vec<usize> {
        (0..self.elements.len())
            .filter(|&i| labels::label(i).starts_with(prefix))
            .collect()
    }

    /// Rank elements whose display name fuzzy-matches `query`, best first.
    ///
    /// Ties keep index order so earlier (ergonomically cheaper) labels win.
    #[must_use]
    pub fn rank_by_name(&self, query: &str) -> Vec<(usize, i32)> {
        let mut ranked: Vec<(usize, i32)> = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, el)| {
                let s = fuzzy::score(query, el.display_name());
                (s > fuzzy::NO_MATCH_SCORE).then_some((i, s))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Labeled, serializable summaries for the overlay view.
    #[must_use]
    pub fn summaries(&self) -> Vec<ElementSummary> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, el)| ElementSummary {
                label: labels::label(i),
                role: el.role(),
                name: el.display_name().to_string(),
                frame: el.frame(),
            })
            .collect()
    }
}

/// Truncate to at most `max_cols` display columns, on a char boundary.
fn clamp_display_cols(s: &str, max_cols: usize) -> String {
    let mut cols = 0usize;
    let mut out = String::new();
    for ch in s.chars() {
        cols += ch.width().unwrap_or(0);
        if cols > max_cols {
            break;
        }
        out.push(ch);
    }
    out
}

//! In-memory UI tree used by tests and the simulation backend.
//!
//! A [`SyntheticTree`] is built declaratively from [`NodeBuilder`]s and
//! handed out as [`UiNode`] handles. Every handle creation and drop is
//! counted, which is what lets tests assert the scanner's release
//! discipline: after a snapshot is dropped, `live_handles` must be zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::tree::{Activation, NodeHandle, Rect, UiNode};

/// Shared bookkeeping for one synthetic tree.
#[derive(Debug, Default)]
struct TreeStats {
    /// Handles currently alive (retained, not yet released).
    live_handles: AtomicUsize,
    /// Total handles ever retained.
    retained_total: AtomicUsize,
    /// Titles of activated nodes, in activation order.
    activations: Mutex<Vec<(String, Activation)>>,
}

#[derive(Debug)]
struct NodeData {
    role: Option<String>,
    title: Option<String>,
    description: Option<String>,
    frame: Option<Rect>,
    enabled: Option<bool>,
    children: Vec<Arc<NodeData>>,
    /// Artificial latency applied to every attribute read.
    attribute_delay: Duration,
    /// Whether `activate` reports success.
    activates: bool,
    stats: Arc<TreeStats>,
}

/// Builder for one synthetic node and its subtree.
#[derive(Debug)]
pub struct NodeBuilder {
    role: Option<String>,
    title: Option<String>,
    description: Option<String>,
    frame: Option<Rect>,
    enabled: Option<bool>,
    children: Vec<NodeBuilder>,
    attribute_delay: Duration,
    activates: bool,
}

/// Start a node with a role and title. Empty strings read back as absent
/// attributes, mirroring a node that refuses the read.
#[must_use]
pub fn node(role: &str, title: &str) -> NodeBuilder {
    NodeBuilder {
        role: (!role.is_empty()).then(|| role.to_string()),
        title: (!title.is_empty()).then(|| title.to_string()),
        description: None,
        frame: None,
        enabled: None,
        children: Vec::new(),
        attribute_delay: Duration::ZERO,
        activates: true,
    }
}

impl NodeBuilder {
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn frame(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.frame = Some(Rect::new(x, y, width, height));
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Stall every attribute read on this node, for deadline tests.
    #[must_use]
    pub fn attribute_delay(mut self, delay: Duration) -> Self {
        self.attribute_delay = delay;
        self
    }

    /// Make `activate` report failure, simulating a vanished node.
    #[must_use]
    pub fn fails_activation(mut self) -> Self {
        self.activates = false;
        self
    }

    fn build(self, stats: &Arc<TreeStats>) -> Arc<NodeData> {
        Arc::new(NodeData {
            role: self.role,
            title: self.title,
            description: self.description,
            frame: self.frame,
            enabled: self.enabled,
            children: self
                .children
                .into_iter()
                .map(|c| c.build(stats))
                .collect(),
            attribute_delay: self.attribute_delay,
            activates: self.activates,
            stats: Arc::clone(stats),
        })
    }
}

/// A complete synthetic tree plus its handle/activation bookkeeping.
#[derive(Debug, Clone)]
pub struct SyntheticTree {
    root: Arc<NodeData>,
    stats: Arc<TreeStats>,
}

impl SyntheticTree {
    #[must_use]
    pub fn new(root: NodeBuilder) -> Self {
        let stats = Arc::new(TreeStats::default());
        Self {
            root: root.build(&stats),
            stats,
        }
    }

    /// Retain a fresh handle on the root.
    #[must_use]
    pub fn root_handle(&self) -> NodeHandle {
        Box::new(SyntheticHandle::retain(Arc::clone(&self.root)))
    }

    /// Handles currently retained and not yet released.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.stats.live_handles.load(Ordering::SeqCst)
    }

    /// Total handles retained over the tree's lifetime.
    #[must_use]
    pub fn retained_total(&self) -> usize {
        self.stats.retained_total.load(Ordering::SeqCst)
    }

    /// Display titles of activated nodes, in order.
    #[must_use]
    pub fn activations(&self) -> Vec<(String, Activation)> {
        self.stats.activations.lock().expect("activation log").clone()
    }
}

/// One retained reference to a synthetic node.
struct SyntheticHandle {
    data: Arc<NodeData>,
}

impl SyntheticHandle {
    fn retain(data: Arc<NodeData>) -> Self {
        data.stats.live_handles.fetch_add(1, Ordering::SeqCst);
        data.stats.retained_total.fetch_add(1, Ordering::SeqCst);
        Self { data }
    }

    fn stall(&self) {
        if !self.data.attribute_delay.is_zero() {
            thread::sleep(self.data.attribute_delay);
        }
    }
}

impl Drop for SyntheticHandle {
    fn drop(&mut self) {
        self.data.stats.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl UiNode for SyntheticHandle {
    fn role(&self) -> Option<String> {
        self.stall();
        self.data.role.clone()
    }

    fn title(&self) -> Option<String> {
        self.data.title.clone()
    }

    fn description(&self) -> Option<String> {
        self.data.description.clone()
    }

    fn frame(&self) -> Option<Rect> {
        self.data.frame
    }

    fn enabled(&self) -> Option<bool> {
        self.data.enabled
    }

    fn children(&self) -> Vec<NodeHandle> {
        self.data
            .children
            .iter()
            .map(|c| Box::new(SyntheticHandle::retain(Arc::clone(c))) as NodeHandle)
            .collect()
    }

    fn activate(&self, how: Activation) -> bool {
        let title = self
            .data
            .title
            .clone()
            .unwrap_or_else(|| "<untitled>".to_string());
        self.data
            .stats
            .activations
            .lock()
            .expect("activation log")
            .push((title, how));
        self.data.activates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_counted_per_retention() {
        let tree = SyntheticTree::new(node("window", "w").child(node("button", "b")));
        assert_eq!(tree.live_handles(), 0);

        let root = tree.root_handle();
        assert_eq!(tree.live_handles(), 1);

        let children = root.children();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.live_handles(), 2);

        drop(children);
        assert_eq!(tree.live_handles(), 1);
        drop(root);
        assert_eq!(tree.live_handles(), 0);
        assert_eq!(tree.retained_total(), 2);
    }

    #[test]
    fn empty_attributes_read_back_as_absent() {
        let tree = SyntheticTree::new(node("", ""));
        let root = tree.root_handle();
        assert_eq!(root.role(), None);
        assert_eq!(root.title(), None);
        assert_eq!(root.enabled(), None);
        assert_eq!(root.frame(), None);
    }

    #[test]
    fn activation_is_recorded_and_can_fail() {
        let tree = SyntheticTree::new(node("button", "ok").fails_activation());
        let root = tree.root_handle();
        assert!(!root.activate(Activation::Press));
        assert_eq!(
            tree.activations(),
            vec![("ok".to_string(), Activation::Press)]
        );
    }
}

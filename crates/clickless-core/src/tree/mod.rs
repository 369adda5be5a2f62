//! Accessibility-tree types: roles, geometry, and node handles.
//!
//! The UI tree belongs to another process; this crate only ever sees it
//! through opaque handles implementing [`UiNode`]. Attribute reads return
//! `Option` because any single node may refuse any single read (detached
//! node, missing attribute); callers omit the datum and carry on.
//!
//! Roles are a closed tagged variant rather than free-form strings: the
//! clickable vocabulary is a fixed allow-list, and activation behavior
//! (press vs. focus) hangs off the same tag.

pub mod scan;
pub mod synthetic;

use serde::{Deserialize, Serialize};

/// Role of a UI element, restricted to the clickable allow-list.
///
/// Anything outside the allow-list parses to [`Role::Unknown`] and is never
/// collected into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Button,
    Link,
    MenuBarItem,
    PopUpButton,
    CheckBox,
    RadioButton,
    Tab,
    ToolbarButton,
    Cell,
    Row,
    DisclosureTriangle,
    Stepper,
    TextField,
    TextArea,
    ComboBox,
    Slider,
    ColorWell,
    OutlineRow,
    Unknown,
}

impl Role {
    /// Parse a role attribute string.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "button" => Role::Button,
            "link" => Role::Link,
            "menu-bar-item" => Role::MenuBarItem,
            "pop-up-button" => Role::PopUpButton,
            "checkbox" | "check-box" => Role::CheckBox,
            "radio-button" => Role::RadioButton,
            "tab" => Role::Tab,
            "toolbar-button" => Role::ToolbarButton,
            "cell" => Role::Cell,
            "row" => Role::Row,
            "disclosure-triangle" => Role::DisclosureTriangle,
            "stepper" => Role::Stepper,
            "text-field" => Role::TextField,
            "text-area" => Role::TextArea,
            "combo-box" => Role::ComboBox,
            "slider" => Role::Slider,
            "color-well" => Role::ColorWell,
            "outline-row" => Role::OutlineRow,
            _ => Role::Unknown,
        }
    }

    /// Canonical name, the inverse of [`Role::parse`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Link => "link",
            Role::MenuBarItem => "menu-bar-item",
            Role::PopUpButton => "pop-up-button",
            Role::CheckBox => "checkbox",
            Role::RadioButton => "radio-button",
            Role::Tab => "tab",
            Role::ToolbarButton => "toolbar-button",
            Role::Cell => "cell",
            Role::Row => "row",
            Role::DisclosureTriangle => "disclosure-triangle",
            Role::Stepper => "stepper",
            Role::TextField => "text-field",
            Role::TextArea => "text-area",
            Role::ComboBox => "combo-box",
            Role::Slider => "slider",
            Role::ColorWell => "color-well",
            Role::OutlineRow => "outline-row",
            Role::Unknown => "unknown",
        }
    }

    /// Whether elements of this role belong in a snapshot.
    #[must_use]
    pub fn is_clickable(self) -> bool {
        !matches!(self, Role::Unknown)
    }

    /// Text-input-like roles request focus on activation instead of a press.
    #[must_use]
    pub fn prefers_focus(self) -> bool {
        matches!(self, Role::TextField | Role::TextArea | Role::ComboBox)
    }
}

/// Screen-coordinate rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, the default click target.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// How a selected element is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Generic press (buttons, links, rows, ...).
    Press,
    /// Focus request, used for text-input-like roles.
    Focus,
}

/// Opaque, retained reference to a node in an externally owned UI tree.
///
/// Each handle owns one retention of the underlying node: dropping the
/// handle releases it, exactly once. Attribute reads are best-effort;
/// `None` means "this node would not say", never a traversal error.
/// `enabled` returning `None` is treated as enabled by callers.
pub trait UiNode: Send {
    fn role(&self) -> Option<String>;
    fn title(&self) -> Option<String>;
    fn description(&self) -> Option<String>;
    fn frame(&self) -> Option<Rect>;
    fn enabled(&self) -> Option<bool>;

    /// Child handles in the tree's native sibling order, each independently
    /// retained. An empty vec means leaf or unobtainable children.
    fn children(&self) -> Vec<NodeHandle>;

    /// Invoke the activation capability bound to this node.
    ///
    /// Returns false when the underlying node has vanished or refused.
    fn activate(&self, how: Activation) -> bool;
}

/// Owned, retained node handle.
pub type NodeHandle = Box<dyn UiNode>;

//! Key interception state machine.
//!
//! While the overlay is hidden the machine is inert; the session only asks
//! it about the toggle hotkey. While visible it owns every keystroke: keys
//! either mutate the typed prefix, drive continuous cursor motion, emit
//! scroll pulses, or commit an action; nothing is passed through to the
//! application underneath.
//!
//! Time never comes from an ambient clock: every entry point takes the
//! current [`Instant`] so the motion ramp and rescan debounce are testable
//! with synthesized timelines.
//!
//! # Key map (overlay visible)
//!
//! | Key | Effect |
//! |-----|--------|
//! | A–Z | append to the typed prefix, then re-match labels |
//! | Backspace | pop prefix; middle-click at cursor when already empty |
//! | Space | activate match (left), or left-click at cursor when empty |
//! | Return | same as Space but right action |
//! | Arrows | hold-to-move with acceleration |
//! | Shift+Arrows | one-shot scroll pulse, schedules a debounced rescan |
//! | Escape | clear holds, hide |
//! | anything else | swallowed |

use std::time::{Duration, Instant};

use crate::snapshot::{ElementSnapshot, LabelMatch};

// Physical keycodes (ANSI layout). Letters are mapped by position, so the
// label vocabulary stays stable across keyboard language layouts.
pub const KEY_A: u16 = 0;
pub const KEY_S: u16 = 1;
pub const KEY_D: u16 = 2;
pub const KEY_F: u16 = 3;
pub const KEY_H: u16 = 4;
pub const KEY_G: u16 = 5;
pub const KEY_Z: u16 = 6;
pub const KEY_X: u16 = 7;
pub const KEY_C: u16 = 8;
pub const KEY_V: u16 = 9;
pub const KEY_B: u16 = 11;
pub const KEY_Q: u16 = 12;
pub const KEY_W: u16 = 13;
pub const KEY_E: u16 = 14;
pub const KEY_R: u16 = 15;
pub const KEY_Y: u16 = 16;
pub const KEY_T: u16 = 17;
pub const KEY_O: u16 = 31;
pub const KEY_U: u16 = 32;
pub const KEY_I: u16 = 34;
pub const KEY_P: u16 = 35;
pub const KEY_L: u16 = 37;
pub const KEY_J: u16 = 38;
pub const KEY_K: u16 = 40;
pub const KEY_N: u16 = 45;
pub const KEY_M: u16 = 46;

pub const KEY_RETURN: u16 = 36;
pub const KEY_TAB: u16 = 48;
pub const KEY_SPACE: u16 = 49;
pub const KEY_BACKSPACE: u16 = 51;
pub const KEY_ESCAPE: u16 = 53;

pub const KEY_LEFT: u16 = 123;
pub const KEY_RIGHT: u16 = 124;
pub const KEY_DOWN: u16 = 125;
pub const KEY_UP: u16 = 126;

/// Map a physical keycode to its letter, if it is one of the A–Z keys.
#[must_use]
pub fn keycode_to_letter(code: u16) -> Option<char> {
    let ch = match code {
        KEY_A => 'A',
        KEY_S => 'S',
        KEY_D => 'D',
        KEY_F => 'F',
        KEY_H => 'H',
        KEY_G => 'G',
        KEY_Z => 'Z',
        KEY_X => 'X',
        KEY_C => 'C',
        KEY_V => 'V',
        KEY_B => 'B',
        KEY_Q => 'Q',
        KEY_W => 'W',
        KEY_E => 'E',
        KEY_R => 'R',
        KEY_Y => 'Y',
        KEY_T => 'T',
        KEY_O => 'O',
        KEY_U => 'U',
        KEY_I => 'I',
        KEY_P => 'P',
        KEY_L => 'L',
        KEY_J => 'J',
        KEY_K => 'K',
        KEY_N => 'N',
        KEY_M => 'M',
        _ => return None,
    };
    Some(ch)
}

/// Letter back to its physical keycode. Inverse of [`keycode_to_letter`].
#[must_use]
pub fn letter_to_keycode(letter: char) -> Option<u16> {
    let code = match letter.to_ascii_uppercase() {
        'A' => KEY_A,
        'S' => KEY_S,
        'D' => KEY_D,
        'F' => KEY_F,
        'H' => KEY_H,
        'G' => KEY_G,
        'Z' => KEY_Z,
        'X' => KEY_X,
        'C' => KEY_C,
        'V' => KEY_V,
        'B' => KEY_B,
        'Q' => KEY_Q,
        'W' => KEY_W,
        'E' => KEY_E,
        'R' => KEY_R,
        'Y' => KEY_Y,
        'T' => KEY_T,
        'O' => KEY_O,
        'U' => KEY_U,
        'I' => KEY_I,
        'P' => KEY_P,
        'L' => KEY_L,
        'J' => KEY_J,
        'K' => KEY_K,
        'N' => KEY_N,
        'M' => KEY_M,
        _ => return None,
    };
    Some(code)
}

/// Modifier flags accompanying a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub command: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
        command: false,
    };

    /// Any non-shift modifier held. Shift is meaningful on its own (scroll
    /// pulses); the others turn a key into a chord we swallow untouched.
    #[must_use]
    pub fn chorded(&self) -> bool {
        self.control || self.alt || self.command
    }
}

/// One raw key event as delivered by the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u16,
    /// True on key-down, false on key-up.
    pub pressed: bool,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub fn down(code: u16) -> Self {
        Self {
            code,
            pressed: true,
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub fn up(code: u16) -> Self {
        Self {
            code,
            pressed: false,
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }
}

/// Pointer button for commit actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Command surfaced to the session controller.
///
/// `Activate` and `ActAtCursor` are emitted with the machine already back
/// in `Hidden`: the controller suppresses the overlay, waits a short grace
/// delay, and only then invokes the capability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Activate the element at this snapshot index.
    Activate {
        index: usize,
        button: PointerButton,
    },
    /// Act at the current cursor position.
    ActAtCursor { button: PointerButton },
    /// One-shot scroll pulse, in scroll units.
    Scroll { dx: f64, dy: f64 },
    /// Tear the overlay down without acting.
    Hide,
}

/// Cursor/scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    #[must_use]
    fn from_code(code: u16) -> Option<Self> {
        match code {
            KEY_UP => Some(Direction::Up),
            KEY_DOWN => Some(Direction::Down),
            KEY_LEFT => Some(Direction::Left),
            KEY_RIGHT => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit vector in screen coordinates (y grows downward).
    #[must_use]
    fn vector(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Which directional keys are currently down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl HeldDirections {
    fn set(&mut self, dir: Direction, held: bool) {
        match dir {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Combined axis signs; opposing holds cancel.
    #[must_use]
    fn axes(&self) -> (f64, f64) {
        let x = f64::from(self.right as i8 - self.left as i8);
        let y = f64::from(self.down as i8 - self.up as i8);
        (x, y)
    }
}

// Continuous motion ramp.
pub const BASE_SPEED: f64 = 150.0;
pub const MAX_SPEED: f64 = 2000.0;
pub const ACCEL_TIME: Duration = Duration::from_secs(1);

/// Scroll units emitted per shift+arrow pulse.
pub const SCROLL_PULSE: f64 = 50.0;

/// Quiet period after the last scroll pulse before a rescan fires.
pub const RESCAN_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Typed-prefix buffer cap.
pub const MAX_PREFIX_LEN: usize = 8;

/// The label-driven input state machine.
///
/// Owns the overlay mode, the typed prefix, directional-hold state, and
/// the scroll-rescan debounce. Key events come in; [`Command`]s come out.
#[derive(Debug)]
pub struct InputMachine {
    visible: bool,
    prefix: String,
    held: HeldDirections,
    /// When the first still-held direction went down. Not reset by adding
    /// a second direction; cleared when all are released.
    motion_started: Option<Instant>,
    last_motion_tick: Option<Instant>,
    last_scroll: Option<Instant>,
    rescan_pending: bool,
    debounce: Duration,
}

impl Default for InputMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl InputMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: false,
            prefix: String::new(),
            held: HeldDirections::default(),
            motion_started: None,
            last_motion_tick: None,
            last_scroll: None,
            rescan_pending: false,
            debounce: RESCAN_DEBOUNCE,
        }
    }

    /// Override the rescan debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn typed_prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn held(&self) -> HeldDirections {
        self.held
    }

    /// Enter `Visible`: fresh prefix, all directions released, no pending
    /// scroll state.
    pub fn show(&mut self) {
        self.visible = true;
        self.prefix.clear();
        self.held.clear();
        self.motion_started = None;
        self.last_motion_tick = None;
        self.last_scroll = None;
        self.rescan_pending = false;
    }

    /// Enter `Hidden`, abandoning any pending rescan and held directions.
    pub fn hide(&mut self) {
        self.visible = false;
        self.prefix.clear();
        self.held.clear();
        self.motion_started = None;
        self.last_motion_tick = None;
        self.last_scroll = None;
        self.rescan_pending = false;
    }

    /// Feed one raw key event. Only meaningful while visible; the session
    /// handles the toggle hotkey itself while hidden.
    pub fn handle_key(
        &mut self,
        event: KeyEvent,
        snapshot: &ElementSnapshot,
        now: Instant,
    ) -> Vec<Command> {
        let mut out = Vec::new();
        if !self.visible {
            return out;
        }

        if let Some(dir) = Direction::from_code(event.code) {
            self.handle_arrow(dir, event, now, &mut out);
            return out;
        }

        // Everything below acts on key-down only; key-ups are swallowed.
        if !event.pressed || event.modifiers.chorded() {
            return out;
        }

        match event.code {
            KEY_ESCAPE => {
                self.hide();
                out.push(Command::Hide);
            }
            KEY_BACKSPACE => {
                if self.prefix.pop().is_none() {
                    self.visible = false;
                    out.push(Command::ActAtCursor {
                        button: PointerButton::Middle,
                    });
                } else {
                    self.rematch(snapshot, &mut out);
                }
            }
            KEY_SPACE => self.commit(snapshot, PointerButton::Left, &mut out),
            KEY_RETURN => self.commit(snapshot, PointerButton::Right, &mut out),
            code => {
                if let Some(letter) = keycode_to_letter(code) {
                    if self.prefix.len() < MAX_PREFIX_LEN {
                        self.prefix.push(letter);
                        self.rematch(snapshot, &mut out);
                    }
                }
                // Unmapped keys are silently discarded.
            }
        }
        out
    }

    fn handle_arrow(
        &mut self,
        dir: Direction,
        event: KeyEvent,
        now: Instant,
        out: &mut Vec<Command>,
    ) {
        if event.modifiers.chorded() {
            return;
        }
        if event.modifiers.shift {
            // One-shot scroll pulse; hold state untouched.
            if event.pressed {
                let (dx, dy) = dir.vector();
                out.push(Command::Scroll {
                    dx: dx * SCROLL_PULSE,
                    dy: dy * SCROLL_PULSE,
                });
                self.last_scroll = Some(now);
                self.rescan_pending = true;
            }
            return;
        }
        if event.pressed {
            if !self.held.any() {
                self.motion_started = Some(now);
                self.last_motion_tick = Some(now);
            }
            self.held.set(dir, true);
        } else {
            self.held.set(dir, false);
            if !self.held.any() {
                // Next hold restarts the ramp from base speed.
                self.motion_started = None;
                self.last_motion_tick = None;
            }
        }
    }

    /// Re-run label matching after a prefix mutation.
    fn rematch(&mut self, snapshot: &ElementSnapshot, out: &mut Vec<Command>) {
        if self.prefix.is_empty() {
            return;
        }
        match snapshot.match_prefix(&self.prefix) {
            LabelMatch::Exact(index) => {
                self.visible = false;
                out.push(Command::Activate {
                    index,
                    button: PointerButton::Left,
                });
            }
            LabelMatch::Partial => {}
            LabelMatch::NoMatch => self.prefix.clear(),
        }
    }

    /// Space/Return: commit the current match, or act at the cursor when
    /// nothing has been typed.
    fn commit(&mut self, snapshot: &ElementSnapshot, button: PointerButton, out: &mut Vec<Command>) {
        if self.prefix.is_empty() {
            self.visible = false;
            out.push(Command::ActAtCursor { button });
            return;
        }
        let target = match snapshot.match_prefix(&self.prefix) {
            LabelMatch::Exact(index) => Some(index),
            LabelMatch::Partial => snapshot.first_prefix_match(&self.prefix),
            LabelMatch::NoMatch => None,
        };
        match target {
            Some(index) => {
                self.visible = false;
                out.push(Command::Activate { index, button });
            }
            None => self.prefix.clear(),
        }
    }

    /// Current ramp speed in units/second, or `None` when nothing is held.
    ///
    /// Speed ramps linearly from [`BASE_SPEED`] to [`MAX_SPEED`] over
    /// [`ACCEL_TIME`], measured from the first hold.
    #[must_use]
    pub fn motion_speed(&self, now: Instant) -> Option<f64> {
        if !self.held.any() {
            return None;
        }
        let started = self.motion_started?;
        let t = now.saturating_duration_since(started).as_secs_f64() / ACCEL_TIME.as_secs_f64();
        Some(BASE_SPEED + (MAX_SPEED - BASE_SPEED) * t.min(1.0))
    }

    /// Displacement to apply this frame, or `None` when idle.
    ///
    /// Frame delta is measured between consecutive calls; diagonal holds
    /// displace both axes independently.
    #[must_use]
    pub fn motion_delta(&mut self, now: Instant) -> Option<(f64, f64)> {
        let speed = self.motion_speed(now)?;
        let last = self.last_motion_tick.replace(now)?;
        let dt = now.saturating_duration_since(last).as_secs_f64();
        if dt <= 0.0 {
            return None;
        }
        let (ax, ay) = self.held.axes();
        if ax == 0.0 && ay == 0.0 {
            return None;
        }
        Some((ax * speed * dt, ay * speed * dt))
    }

    #[must_use]
    pub fn rescan_pending(&self) -> bool {
        self.rescan_pending
    }

    /// Fire the debounced rescan if its quiet period has elapsed.
    ///
    /// Returns true at most once per scroll burst; each new pulse pushes
    /// the deadline out. Firing also resets the typed prefix, since elements
    /// may have moved under the scroll.
    #[must_use]
    pub fn take_due_rescan(&mut self, now: Instant) -> bool {
        if !self.visible || !self.rescan_pending {
            return false;
        }
        let due = self
            .last_scroll
            .is_some_and(|at| now.saturating_duration_since(at) >= self.debounce);
        if due {
            self.rescan_pending = false;
            self.last_scroll = None;
            self.prefix.clear();
        }
        due
    }
}

/// A configurable global toggle hotkey: one key plus a modifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub code: u16,
    pub modifiers: Modifiers,
}

impl Default for Hotkey {
    /// `cmd+shift+space`.
    fn default() -> Self {
        Self {
            code: KEY_SPACE,
            modifiers: Modifiers {
                shift: true,
                command: true,
                ..Modifiers::NONE
            },
        }
    }
}

/// Error from [`Hotkey::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyParseError {
    pub spec: String,
    pub problem: String,
}

impl std::fmt::Display for HotkeyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid hotkey '{}': {}", self.spec, self.problem)
    }
}

impl std::error::Error for HotkeyParseError {}

impl Hotkey {
    /// Parse a spec like `"cmd+shift+space"` or `"ctrl+g"`.
    ///
    /// Modifiers: `cmd`/`command`, `ctrl`/`control`, `alt`/`option`,
    /// `shift`. Keys: the letters a–z, `space`, `return`/`enter`, `tab`.
    pub fn parse(spec: &str) -> Result<Self, HotkeyParseError> {
        let err = |problem: &str| HotkeyParseError {
            spec: spec.to_string(),
            problem: problem.to_string(),
        };

        let mut modifiers = Modifiers::NONE;
        let mut code = None;
        for part in spec.split('+').map(|p| p.trim().to_ascii_lowercase()) {
            match part.as_str() {
                "" => return Err(err("empty component")),
                "cmd" | "command" => modifiers.command = true,
                "ctrl" | "control" => modifiers.control = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                key => {
                    if code.is_some() {
                        return Err(err("more than one non-modifier key"));
                    }
                    code = Some(parse_key(key).ok_or_else(|| err("unknown key"))?);
                }
            }
        }
        match code {
            Some(code) => Ok(Self { code, modifiers }),
            None => Err(err("no non-modifier key")),
        }
    }

    /// Whether an intercepted event is this hotkey's key-down.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.pressed && event.code == self.code && event.modifiers == self.modifiers
    }
}

fn parse_key(key: &str) -> Option<u16> {
    match key {
        "space" => Some(KEY_SPACE),
        "return" | "enter" => Some(KEY_RETURN),
        "tab" => Some(KEY_TAB),
        _ => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => letter_to_keycode(c),
                _ => None,
            }
        }
    }
}

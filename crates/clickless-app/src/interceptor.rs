//! Bridge between the global key interceptor and the session loop.
//!
//! The platform delivers key events on its own callback context; the
//! session loop consumes them at its own pace. The two meet in a bounded
//! channel: the callback side is the only writer, the session the only
//! reader, and a full queue drops the event rather than block the
//! system's input delivery.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clickless_core::input::{
    letter_to_keycode, Hotkey, KeyEvent, KEY_BACKSPACE, KEY_DOWN, KEY_ESCAPE, KEY_LEFT,
    KEY_RETURN, KEY_RIGHT, KEY_SPACE, KEY_UP,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the interceptor-to-session event queue.
pub const EVENT_QUEUE_CAP: usize = 128;

/// Sending half handed to the interceptor callback.
#[derive(Clone)]
pub struct KeyTap {
    tx: mpsc::Sender<KeyEvent>,
}

impl KeyTap {
    /// Deliver one event without blocking the callback context.
    ///
    /// Returns false when the queue is full or the session is gone; the
    /// event is dropped, never queued out of order.
    pub fn deliver(&self, event: KeyEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping key event: {e}");
                false
            }
        }
    }
}

/// Create the bounded interceptor-to-session channel.
#[must_use]
pub fn channel() -> (KeyTap, mpsc::Receiver<KeyEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAP);
    (KeyTap { tx }, rx)
}

/// Registration seam for a global key interceptor.
pub trait Interceptor: Send + Sync {
    /// Install `tap` as the event sink. At most one registration at a
    /// time; re-registering replaces the previous sink.
    fn register(&self, tap: KeyTap) -> Result<()>;

    /// Stop intercepting. Captured keys flow back to the system.
    fn unregister(&self);
}

/// Interceptor that reads key names from stdin, one per line.
///
/// This is the simulation backend's event source: each line becomes a
/// key-down/key-up tap, so the agent can be driven from a terminal. A
/// background thread owns the blocking reads and forwards through the
/// tap, mirroring how a real event-tap callback would.
///
/// Line grammar: `hotkey` (the configured toggle chord), `esc`, `space`,
/// `enter`, `backspace`, `up`/`down`/`left`/`right` (optionally prefixed
/// `shift+`), or letters: `save` taps S, A, V, E in order.
pub struct StdinInterceptor {
    hotkey: Hotkey,
    shutdown: Arc<AtomicBool>,
}

impl StdinInterceptor {
    #[must_use]
    pub fn new(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Interceptor for StdinInterceptor {
    fn register(&self, tap: KeyTap) -> Result<()> {
        let hotkey = self.hotkey;
        let shutdown = Arc::clone(&self.shutdown);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(line) = line else { break };
                let events = parse_key_line(&line, hotkey);
                if events.is_empty() && !line.trim().is_empty() {
                    warn!("unrecognized key line: {line:?}");
                }
                for event in events {
                    if !tap.deliver(event) {
                        return;
                    }
                }
            }
            debug!("stdin interceptor finished");
        });
        Ok(())
    }

    fn unregister(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Interceptor whose events are injected programmatically; used by the
/// demo script and tests.
#[derive(Default)]
pub struct SyntheticInterceptor {
    tap: std::sync::Mutex<Option<KeyTap>>,
}

impl SyntheticInterceptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject one event as if the platform delivered it.
    pub fn inject(&self, event: KeyEvent) -> bool {
        self.tap
            .lock()
            .expect("tap")
            .as_ref()
            .is_some_and(|tap| tap.deliver(event))
    }
}

impl Interceptor for SyntheticInterceptor {
    fn register(&self, tap: KeyTap) -> Result<()> {
        *self.tap.lock().expect("tap") = Some(tap);
        Ok(())
    }

    fn unregister(&self) {
        *self.tap.lock().expect("tap") = None;
    }
}

/// Parse one stdin line into key events (a down/up tap per key).
fn parse_key_line(line: &str, hotkey: Hotkey) -> Vec<KeyEvent> {
    let word = line.trim().to_ascii_lowercase();
    if word.is_empty() {
        return Vec::new();
    }

    if word == "hotkey" {
        let mut down = KeyEvent::down(hotkey.code);
        down.modifiers = hotkey.modifiers;
        let mut up = KeyEvent::up(hotkey.code);
        up.modifiers = hotkey.modifiers;
        return vec![down, up];
    }

    let (shifted, key) = match word.strip_prefix("shift+") {
        Some(rest) => (true, rest),
        None => (false, word.as_str()),
    };

    let code = match key {
        "esc" | "escape" => Some(KEY_ESCAPE),
        "space" => Some(KEY_SPACE),
        "enter" | "return" => Some(KEY_RETURN),
        "backspace" => Some(KEY_BACKSPACE),
        "up" => Some(KEY_UP),
        "down" => Some(KEY_DOWN),
        "left" => Some(KEY_LEFT),
        "right" => Some(KEY_RIGHT),
        _ => None,
    };
    if let Some(code) = code {
        let mut down = KeyEvent::down(code);
        let mut up = KeyEvent::up(code);
        if shifted {
            down = down.with_shift();
            up = up.with_shift();
        }
        return vec![down, up];
    }

    // A bare word taps its letters in order.
    let mut events = Vec::new();
    for ch in key.chars() {
        match letter_to_keycode(ch) {
            Some(code) => {
                events.push(KeyEvent::down(code));
                events.push(KeyEvent::up(code));
            }
            None => return Vec::new(),
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickless_core::input::KEY_A;

    fn hotkey() -> Hotkey {
        Hotkey::parse("cmd+shift+space").unwrap()
    }

    #[test]
    fn channel_delivers_in_order() {
        let (tap, mut rx) = channel();
        assert!(tap.deliver(KeyEvent::down(KEY_A)));
        assert!(tap.deliver(KeyEvent::up(KEY_A)));
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::down(KEY_A));
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::up(KEY_A));
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (tap, _rx) = channel();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(tap.deliver(KeyEvent::down(KEY_A)));
        }
        assert!(!tap.deliver(KeyEvent::down(KEY_A)));
    }

    #[test]
    fn parse_hotkey_line_carries_modifiers() {
        let events = parse_key_line("hotkey", hotkey());
        assert_eq!(events.len(), 2);
        assert!(events[0].pressed);
        assert!(events[0].modifiers.command && events[0].modifiers.shift);
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!(parse_key_line("esc", hotkey())[0].code, KEY_ESCAPE);
        assert_eq!(parse_key_line("space", hotkey())[0].code, KEY_SPACE);
        assert_eq!(parse_key_line("enter", hotkey())[0].code, KEY_RETURN);
        let shifted = parse_key_line("shift+up", hotkey());
        assert_eq!(shifted[0].code, KEY_UP);
        assert!(shifted[0].modifiers.shift);
    }

    #[test]
    fn parse_word_taps_each_letter() {
        let events = parse_key_line("as", hotkey());
        assert_eq!(events.len(), 4);
        assert!(events[0].pressed && !events[1].pressed);
    }

    #[test]
    fn parse_garbage_is_empty() {
        assert!(parse_key_line("12#", hotkey()).is_empty());
        assert!(parse_key_line("", hotkey()).is_empty());
    }

    #[test]
    fn synthetic_interceptor_requires_registration() {
        let interceptor = SyntheticInterceptor::new();
        assert!(!interceptor.inject(KeyEvent::down(KEY_A)));

        let (tap, mut rx) = channel();
        interceptor.register(tap).unwrap();
        assert!(interceptor.inject(KeyEvent::down(KEY_A)));
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::down(KEY_A));

        interceptor.unregister();
        assert!(!interceptor.inject(KeyEvent::up(KEY_A)));
    }
}

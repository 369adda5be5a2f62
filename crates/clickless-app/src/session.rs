//! Session controller: orchestrates scans, key events, and commands.
//!
//! One controller owns the whole overlay lifecycle. The interceptor feeds
//! key events through a bounded channel; a fixed-interval tick drives
//! continuous cursor motion, scan completion, and the debounced rescan.
//! Scans run on a blocking thread so the 500 ms budget never stalls the
//! event loop, and every scan carries a generation number: a result that
//! arrives after hide (or after a newer scan started) is dropped, which
//! releases its handles without ever touching session state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clickless_core::input::{Command, Hotkey, InputMachine, KeyEvent, PointerButton};
use clickless_core::snapshot::ElementSnapshot;
use clickless_core::tree::scan::{scan, ScanBudget};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::platform::{Accessibility, OverlayView, Pointer, ProcessId};

/// How often the session loop services motion, scans, and the debounce.
pub const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Delay between hiding the overlay and invoking an activation, so the
/// visual suppression lands before focus may move to another window.
pub const ACTIVATION_GRACE: Duration = Duration::from_millis(25);

/// How often the trust gate is re-polled while waiting.
pub const TRUST_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Tunables for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub hotkey: Hotkey,
    pub budget: ScanBudget,
    pub rescan_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hotkey: Hotkey::default(),
            budget: ScanBudget::default(),
            rescan_debounce: clickless_core::input::RESCAN_DEBOUNCE,
        }
    }
}

struct InflightScan {
    generation: u64,
    task: JoinHandle<ElementSnapshot>,
}

/// Orchestrates the scanner, the input machine, and the capabilities.
pub struct SessionController {
    access: Arc<dyn Accessibility>,
    pointer: Arc<dyn Pointer>,
    view: Arc<dyn OverlayView>,
    config: SessionConfig,
    machine: InputMachine,
    snapshot: Option<ElementSnapshot>,
    /// Foreground target captured at show time, before any scan runs.
    target: Option<ProcessId>,
    scan_generation: u64,
    inflight: Option<InflightScan>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        access: Arc<dyn Accessibility>,
        pointer: Arc<dyn Pointer>,
        view: Arc<dyn OverlayView>,
        config: SessionConfig,
    ) -> Self {
        let machine = InputMachine::new().with_debounce(config.rescan_debounce);
        Self {
            access,
            pointer,
            view,
            config,
            machine,
            snapshot: None,
            target: None,
            scan_generation: 0,
            inflight: None,
        }
    }

    /// Block until accessibility trust is granted, prompting once.
    pub async fn wait_for_trust(&self) {
        if self.access.is_trusted() {
            return;
        }
        self.access.request_trust();
        info!("waiting: {}", SessionError::PermissionDenied);
        while !self.access.is_trusted() {
            tokio::time::sleep(TRUST_POLL_INTERVAL).await;
        }
        info!("accessibility trust granted");
    }

    /// Drive the session until the interceptor channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<KeyEvent>) -> Result<(), SessionError> {
        self.wait_for_trust().await;
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.on_key(event).await,
                    None => {
                        // Releasing the overlay (and with it the captured
                        // keys) is the one thing that must not be skipped.
                        self.hide_overlay();
                        return Err(SessionError::InterceptorClosed);
                    }
                },
                _ = tick.tick() => self.on_tick().await,
            }
        }
    }

    async fn on_key(&mut self, event: KeyEvent) {
        if self.config.hotkey.matches(&event) {
            if self.machine.is_visible() {
                debug!("hotkey toggle: hide");
                self.hide_overlay();
            } else {
                debug!("hotkey toggle: show");
                self.show_overlay();
            }
            return;
        }
        if !self.machine.is_visible() {
            // Hidden: everything except the hotkey flows to the system.
            return;
        }

        let commands = {
            let fallback = ElementSnapshot::empty();
            let snapshot = self.snapshot.as_ref().unwrap_or(&fallback);
            self.machine.handle_key(event, snapshot, Instant::now())
        };
        for command in commands {
            self.apply(command).await;
        }

        if self.machine.is_visible() {
            if let Some(snapshot) = self.snapshot.as_ref() {
                let prefix = self.machine.typed_prefix();
                self.view.narrow(prefix, &snapshot.prefix_candidates(prefix));
            }
        }
    }

    async fn on_tick(&mut self) {
        self.poll_inflight_scan().await;

        let now = Instant::now();
        if let Some((dx, dy)) = self.machine.motion_delta(now) {
            let (x, y) = self.pointer.cursor_position();
            self.pointer.move_cursor_to(x + dx, y + dy);
        }

        // Coalesced: the debounce only fires when no scan is outstanding,
        // so two walks never overlap.
        if self.inflight.is_none() && self.machine.take_due_rescan(now) {
            if let Some(pid) = self.target {
                info!("rescan after scroll settled");
                self.start_scan(pid);
            }
        }
    }

    async fn apply(&mut self, command: Command) {
        match command {
            Command::Hide => self.hide_overlay(),
            Command::Scroll { dx, dy } => {
                self.pointer.scroll(dx, dy);
            }
            Command::Activate { index, button } => self.activate_element(index, button).await,
            Command::ActAtCursor { button } => self.act_at_cursor(button).await,
        }
    }

    /// Activate a matched element. The machine is already hidden; the
    /// overlay must visually disappear before the capability fires,
    /// because activation may bring another window frontmost.
    async fn activate_element(&mut self, index: usize, button: PointerButton) {
        self.view.hide();
        tokio::time::sleep(ACTIVATION_GRACE).await;

        let activated = match self.snapshot.as_ref().and_then(|s| s.get(index)) {
            Some(element) => match button {
                PointerButton::Left => element.activate(),
                PointerButton::Right => {
                    let (x, y) = element.frame().center();
                    self.pointer.right_click(x, y);
                    true
                }
                PointerButton::Middle => {
                    let (x, y) = element.frame().center();
                    self.pointer.middle_click(x, y);
                    true
                }
            },
            None => false,
        };
        if !activated {
            // The node may be gone; never retried.
            warn!(index, "{}", SessionError::ActivationFailed);
        }
        self.hide_overlay();
    }

    async fn act_at_cursor(&mut self, button: PointerButton) {
        self.view.hide();
        tokio::time::sleep(ACTIVATION_GRACE).await;

        let (x, y) = self.pointer.cursor_position();
        match button {
            PointerButton::Left => self.pointer.click(x, y),
            PointerButton::Right => self.pointer.right_click(x, y),
            PointerButton::Middle => self.pointer.middle_click(x, y),
        }
        self.hide_overlay();
    }

    fn show_overlay(&mut self) {
        self.machine.show();
        self.target = self.access.foreground_process();
        match self.target {
            Some(pid) => {
                info!(pid, "overlay shown; scanning");
                self.start_scan(pid);
            }
            None => {
                // Degrade to an empty overlay rather than failing.
                warn!("{}", SessionError::NoForegroundTarget);
                self.snapshot = Some(ElementSnapshot::empty());
                self.view.show(&[]);
            }
        }
    }

    fn start_scan(&mut self, pid: ProcessId) {
        // Old handles are released before the new walk begins.
        self.snapshot = None;
        self.scan_generation += 1;
        let generation = self.scan_generation;
        let budget = self.config.budget;
        match self.access.tree_root(pid) {
            Some(root) => {
                let task = tokio::task::spawn_blocking(move || scan(root, &budget));
                self.inflight = Some(InflightScan { generation, task });
            }
            None => {
                warn!(pid, "target has no tree root");
                self.snapshot = Some(ElementSnapshot::empty());
                self.view.show(&[]);
            }
        }
    }

    async fn poll_inflight_scan(&mut self) {
        if !self.inflight.as_ref().is_some_and(|s| s.task.is_finished()) {
            return;
        }
        let InflightScan { generation, task } = self.inflight.take().expect("checked above");
        let snapshot = match task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("scan task failed: {e}");
                ElementSnapshot::empty()
            }
        };
        if generation == self.scan_generation && self.machine.is_visible() {
            info!(
                elements = snapshot.len(),
                partial = snapshot.deadline_hit(),
                "scan complete"
            );
            self.view.show(&snapshot.summaries());
            self.snapshot = Some(snapshot);
        } else {
            // Completed after hide or superseded; dropping it releases
            // its handles without touching session state.
            debug!("discarding stale scan result");
        }
    }

    fn hide_overlay(&mut self) {
        self.machine.hide();
        self.view.hide();
        // Any in-flight scan result is now stale.
        self.scan_generation += 1;
        // Dropping the snapshot releases every retained handle.
        self.snapshot = None;
        self.target = None;
    }

    #[cfg(test)]
    fn snapshot_len(&self) -> Option<usize> {
        self.snapshot.as_ref().map(ElementSnapshot::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::synthetic::{PointerOp, SyntheticDesktop};
    use crate::platform::TracingOverlay;
    use clickless_core::input::{KEY_A, KEY_D, KEY_ESCAPE, KEY_RIGHT, KEY_S, KEY_SPACE, KEY_UP};
    use clickless_core::tree::Activation;

    fn controller(desktop: &Arc<SyntheticDesktop>) -> SessionController {
        controller_with(desktop, SessionConfig::default())
    }

    fn controller_with(
        desktop: &Arc<SyntheticDesktop>,
        config: SessionConfig,
    ) -> SessionController {
        SessionController::new(
            Arc::clone(desktop) as Arc<dyn Accessibility>,
            Arc::clone(desktop) as Arc<dyn Pointer>,
            Arc::new(TracingOverlay),
            config,
        )
    }

    async fn settle_scan(c: &mut SessionController) {
        for _ in 0..100 {
            c.on_tick().await;
            if c.inflight.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("scan never settled");
    }

    fn hotkey_event(config: SessionConfig) -> KeyEvent {
        let mut ev = KeyEvent::down(config.hotkey.code);
        ev.modifiers = config.hotkey.modifiers;
        ev
    }

    #[tokio::test]
    async fn hotkey_shows_and_scans_the_foreground_tree() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;

        assert!(c.machine.is_visible());
        assert_eq!(c.snapshot_len(), Some(6));
    }

    #[tokio::test]
    async fn typing_a_label_activates_and_tears_down() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;

        // "A" labels the first element, the Back toolbar button.
        c.on_key(KeyEvent::down(KEY_A)).await;

        assert!(!c.machine.is_visible());
        assert_eq!(
            desktop.tree().activations(),
            vec![("Back".to_string(), Activation::Press)]
        );
        // Teardown released every retained handle.
        assert_eq!(desktop.tree().live_handles(), 0);
    }

    #[tokio::test]
    async fn text_field_label_requests_focus() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;

        // "D" labels the third element, the Search text field.
        c.on_key(KeyEvent::down(KEY_D)).await;
        assert_eq!(
            desktop.tree().activations(),
            vec![("Search".to_string(), Activation::Focus)]
        );
    }

    #[tokio::test]
    async fn escape_hides_and_releases_handles() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;
        assert!(desktop.tree().live_handles() > 0);

        c.on_key(KeyEvent::down(KEY_ESCAPE)).await;
        assert!(!c.machine.is_visible());
        assert_eq!(desktop.tree().live_handles(), 0);
        assert!(desktop.tree().activations().is_empty());
    }

    #[tokio::test]
    async fn no_foreground_target_degrades_to_empty_overlay() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        desktop.set_foreground(None);
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        assert!(c.machine.is_visible());
        assert_eq!(c.snapshot_len(), Some(0));

        // Typing does nothing, space still clicks at the cursor.
        c.on_key(KeyEvent::down(KEY_S)).await;
        assert!(c.machine.is_visible());
    }

    #[tokio::test]
    async fn space_with_empty_buffer_clicks_at_cursor() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        desktop.set_cursor(123.0, 456.0);
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;
        c.on_key(KeyEvent::down(KEY_SPACE)).await;

        assert!(desktop
            .pointer_ops()
            .contains(&PointerOp::Click(123.0, 456.0)));
        assert!(!c.machine.is_visible());
        assert_eq!(desktop.tree().live_handles(), 0);
    }

    #[tokio::test]
    async fn held_arrow_moves_the_cursor_on_ticks() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        desktop.set_cursor(100.0, 100.0);
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;

        c.on_key(KeyEvent::down(KEY_RIGHT)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        c.on_tick().await;

        let moved = desktop
            .pointer_ops()
            .iter()
            .any(|op| matches!(op, PointerOp::MoveTo(x, _) if *x > 100.0));
        assert!(moved, "expected a rightward MoveTo, got {:?}", desktop.pointer_ops());
    }

    #[tokio::test]
    async fn scroll_pulse_forwards_and_then_rescans_once() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let config = SessionConfig {
            rescan_debounce: Duration::from_millis(50),
            ..SessionConfig::default()
        };
        let mut c = controller_with(&desktop, config);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;
        let scans_before = desktop.tree().retained_total();

        c.on_key(KeyEvent::down(KEY_UP).with_shift()).await;
        assert!(desktop
            .pointer_ops()
            .iter()
            .any(|op| matches!(op, PointerOp::Scroll(_, dy) if *dy < 0.0)));

        // Wait past the debounce; the tick fires exactly one rescan.
        tokio::time::sleep(Duration::from_millis(80)).await;
        c.on_tick().await;
        settle_scan(&mut c).await;

        assert!(c.machine.is_visible());
        assert_eq!(c.snapshot_len(), Some(6));
        assert!(desktop.tree().retained_total() > scans_before);

        // No second rescan afterwards.
        let retained = desktop.tree().retained_total();
        tokio::time::sleep(Duration::from_millis(80)).await;
        c.on_tick().await;
        settle_scan(&mut c).await;
        assert_eq!(desktop.tree().retained_total(), retained);
    }

    #[tokio::test]
    async fn scan_completing_after_hide_is_discarded() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        // Hide immediately, before the scan can be polled in.
        c.on_key(hotkey_event(c.config)).await;
        assert!(!c.machine.is_visible());

        settle_scan(&mut c).await;
        assert_eq!(c.snapshot_len(), None);
        assert_eq!(desktop.tree().live_handles(), 0);
    }

    #[tokio::test]
    async fn activation_failure_still_hides_without_retry() {
        use clickless_core::tree::synthetic::{node, SyntheticTree};
        let tree = SyntheticTree::new(
            node("window", "w")
                .frame(0.0, 0.0, 800.0, 600.0)
                .child(node("button", "ghost").frame(10.0, 10.0, 80.0, 20.0).fails_activation()),
        );
        let desktop = Arc::new(SyntheticDesktop::new(tree));
        let mut c = controller(&desktop);

        c.on_key(hotkey_event(c.config)).await;
        settle_scan(&mut c).await;
        c.on_key(KeyEvent::down(KEY_A)).await;

        // One attempt, overlay down, handles released.
        assert_eq!(desktop.tree().activations().len(), 1);
        assert!(!c.machine.is_visible());
        assert_eq!(desktop.tree().live_handles(), 0);
    }

    #[tokio::test]
    async fn trust_gate_waits_until_granted() {
        let desktop = Arc::new(SyntheticDesktop::sample());
        desktop.set_trusted(false);
        let c = controller(&desktop);

        let waiting = {
            let desktop = Arc::clone(&desktop);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                desktop.set_trusted(true);
            })
        };
        c.wait_for_trust().await;
        assert!(desktop.trust_requested());
        waiting.await.unwrap();
    }
}

/// Keyboard state tracker.
///
/// Lane changes and menu actions are edge-triggered: a key fires once when
/// it goes down and not again until it has been released. Terminals that
/// only send Press/Repeat get a timeout-based release instead.
///
/// Release events are honored only when the renderer managed to turn on
/// crossterm's keyboard enhancement (`Renderer::keyboard_enhanced`).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll};

use crate::domain::rules::LaneShift;

/// Lane intents waiting for a tick. Two pushes reach either edge lane,
/// anything past that is dropped.
const LANE_QUEUE_CAP: usize = 3;

/// After this long without a Press/Repeat event a key counts as released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "up" to "down" during the latest drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before the tick.
    pub fn drain_events(&mut self) {
        self.begin_frame();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // unconfirmed Release events are noise; the timeout handles it
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Was this key freshly pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// The lane change asked for this frame. Both directions at once cancel.
    pub fn lane_intent(&self, left: &[KeyCode], right: &[KeyCode]) -> Option<LaneShift> {
        match (self.any_pressed(left), self.any_pressed(right)) {
            (true, false) => Some(LaneShift::Left),
            (false, true) => Some(LaneShift::Right),
            _ => None,
        }
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

// ── Lane queue ──

/// Frames run faster than ticks, so intents wait here and each tick takes
/// one. Left then Right inside one tick both apply, in order.
#[derive(Debug, Default)]
pub struct LaneQueue {
    pending: VecDeque<LaneShift>,
}

impl LaneQueue {
    pub fn push(&mut self, shift: LaneShift) {
        if self.pending.len() < LANE_QUEUE_CAP {
            self.pending.push_back(shift);
        }
    }

    pub fn next(&mut self) -> Option<LaneShift> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    const LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a')];
    const RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d')];

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    fn frame(input: &mut InputState, keys: &[KeyEvent], now: Instant) {
        input.begin_frame();
        for &k in keys {
            input.record(k, now);
        }
        input.expire(now);
    }

    #[test]
    fn press_fires_once_while_repeating() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        frame(&mut input, &[key(KeyCode::Left, KeyEventKind::Press)], t0);
        assert_eq!(input.lane_intent(LEFT, RIGHT), Some(LaneShift::Left));

        let t1 = t0 + Duration::from_millis(50);
        frame(&mut input, &[key(KeyCode::Left, KeyEventKind::Repeat)], t1);
        assert_eq!(input.lane_intent(LEFT, RIGHT), None);
    }

    #[test]
    fn timeout_releases_key() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        frame(&mut input, &[key(KeyCode::Char('d'), KeyEventKind::Press)], t0);
        let later = t0 + HOLD_TIMEOUT * 2;
        frame(&mut input, &[], later);
        frame(&mut input, &[key(KeyCode::Char('d'), KeyEventKind::Press)], later);
        assert_eq!(input.lane_intent(LEFT, RIGHT), Some(LaneShift::Right));
    }

    #[test]
    fn release_honored_when_enhanced() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t0 = Instant::now();
        frame(&mut input, &[
            key(KeyCode::Enter, KeyEventKind::Press),
            key(KeyCode::Enter, KeyEventKind::Release),
            key(KeyCode::Enter, KeyEventKind::Press),
        ], t0);
        assert!(input.was_pressed(KeyCode::Enter));
        assert_eq!(input.fresh_presses.len(), 2);
    }

    #[test]
    fn release_ignored_without_enhancement() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        frame(&mut input, &[
            key(KeyCode::Enter, KeyEventKind::Press),
            key(KeyCode::Enter, KeyEventKind::Release),
            key(KeyCode::Enter, KeyEventKind::Press),
        ], t0);
        assert_eq!(input.fresh_presses, vec![KeyCode::Enter]);
        assert!(input.held_at(KeyCode::Enter, t0));
    }

    #[test]
    fn queued_lanes_apply_one_per_tick_in_order() {
        let mut q = LaneQueue::default();
        q.push(LaneShift::Left);
        q.push(LaneShift::Right);
        assert_eq!(q.next(), Some(LaneShift::Left));
        assert_eq!(q.next(), Some(LaneShift::Right));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn lane_queue_is_bounded_and_clears() {
        let mut q = LaneQueue::default();
        for _ in 0..10 {
            q.push(LaneShift::Right);
        }
        assert_eq!(std::iter::from_fn(|| q.next()).count(), LANE_QUEUE_CAP);
        q.push(LaneShift::Left);
        q.clear();
        assert_eq!(q.next(), None);
    }

    #[test]
    fn opposite_presses_cancel() {
        let mut input = InputState::new();
        frame(&mut input, &[
            key(KeyCode::Left, KeyEventKind::Press),
            key(KeyCode::Right, KeyEventKind::Press),
        ], Instant::now());
        assert_eq!(input.lane_intent(LEFT, RIGHT), None);
    }

    #[test]
    fn ctrl_c_detected() {
        let mut input = InputState::new();
        let mut k = key(KeyCode::Char('c'), KeyEventKind::Press);
        k.modifiers = KeyModifiers::CONTROL;
        frame(&mut input, &[k], Instant::now());
        assert!(input.ctrl_c_pressed());
    }
}

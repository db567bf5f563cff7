//! The timing state machine

use super::{
    round_ms, CompletedSegment, DisplaySink, KeyRole, Outcome, Phase, SegmentFrame, Tick,
    Transition, SEGMENT_COUNT, WATCHDOG_TIMEOUT_MS,
};
use crate::clock::Millis;
use crate::config::{Config, KeyBindings, TimingZone};
use crate::keyboard::{KeyCode, KeyDirection, KeyEvent};

/// What the transition table asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reset,
    Arm,
    Split,
    Finish,
    Ignore,
}

/// Transition table. Start-key press wins over everything else.
fn action_for(phase: Phase, role: KeyRole, direction: KeyDirection) -> Action {
    use KeyDirection::{Down, Up};
    match (phase, role, direction) {
        (_, KeyRole::Start, Down) => Action::Reset,
        (Phase::Idle, KeyRole::Start, Up) => Action::Arm,
        (Phase::Segment1 | Phase::Segment2, KeyRole::Split, Down) => Action::Split,
        (Phase::Segment3, KeyRole::End, Down) => Action::Finish,
        _ => Action::Ignore,
    }
}

/// Mutable run state. Owned by exactly one [`TimingMachine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentState {
    phase: Phase,
    phase_start: Millis,
    /// t0, t1, t2: when each segment opened
    boundaries: [Option<Millis>; SEGMENT_COUNT],
    /// Per-segment display values (live or frozen)
    displays: [u64; SEGMENT_COUNT],
}

impl Default for SegmentState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            phase_start: 0.0,
            boundaries: [None; SEGMENT_COUNT],
            displays: [0; SEGMENT_COUNT],
        }
    }
}

/// Three-segment timer fed by key events and periodic ticks.
///
/// All methods are cheap and non-blocking; the caller is expected to invoke
/// them from a single thread.
#[derive(Debug, Clone)]
pub struct TimingMachine {
    bindings: KeyBindings,
    zones: [TimingZone; SEGMENT_COUNT],
    state: SegmentState,
}

impl TimingMachine {
    pub fn new(bindings: KeyBindings, zones: [TimingZone; SEGMENT_COUNT]) -> Self {
        Self {
            bindings,
            zones,
            state: SegmentState::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.keys, config.zones())
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn displays(&self) -> [u64; SEGMENT_COUNT] {
        self.state.displays
    }

    pub fn boundaries(&self) -> [Option<Millis>; SEGMENT_COUNT] {
        self.state.boundaries
    }

    pub fn state(&self) -> &SegmentState {
        &self.state
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn zones(&self) -> &[TimingZone; SEGMENT_COUNT] {
        &self.zones
    }

    fn role_of(&self, key: KeyCode) -> Option<KeyRole> {
        if key == self.bindings.start_key {
            Some(KeyRole::Start)
        } else if key == self.bindings.split_key {
            Some(KeyRole::Split)
        } else if key == self.bindings.end_key {
            Some(KeyRole::End)
        } else {
            None
        }
    }

    /// Apply one key event.
    pub fn submit_key_event(&mut self, event: &KeyEvent) -> Outcome {
        let action = self
            .role_of(event.key)
            .map(|role| action_for(self.state.phase, role, event.direction))
            .unwrap_or(Action::Ignore);
        let ts = event.timestamp_ms;

        let transition = match action {
            Action::Reset => {
                self.reset();
                Transition::Reset
            }
            Action::Arm => {
                self.state.boundaries[0] = Some(ts);
                self.state.displays[0] = 0;
                self.enter(Phase::Segment1, ts);
                log::debug!("segment 1 armed at {:.1} ms", ts);
                Transition::Armed
            }
            Action::Split => {
                let (closing, next) = match self.state.phase {
                    Phase::Segment1 => (0, Phase::Segment2),
                    _ => (1, Phase::Segment3),
                };
                let completed = self.freeze(closing, ts);
                for display in &mut self.state.displays[closing + 1..] {
                    *display = 0;
                }
                self.state.boundaries[closing + 1] = Some(ts);
                self.enter(next, ts);
                Transition::Completed(completed)
            }
            Action::Finish => {
                let completed = self.freeze(2, ts);
                self.enter(Phase::Idle, ts);
                Transition::Completed(completed)
            }
            Action::Ignore => Transition::Ignored,
        };

        Outcome {
            phase: self.state.phase,
            transition,
        }
    }

    /// Periodic update: refresh the live value and run the watchdog.
    pub fn tick(&mut self, now_ms: Millis) -> Tick {
        let Some(segment) = self.state.phase.segment_index() else {
            return Tick {
                phase: Phase::Idle,
                live_ms: 0,
                timed_out: false,
            };
        };

        let elapsed = now_ms - self.state.phase_start;
        if elapsed > WATCHDOG_TIMEOUT_MS {
            log::info!(
                "{} open for {:.0} ms, watchdog reset",
                self.state.phase.name(),
                elapsed
            );
            self.reset();
            return Tick {
                phase: Phase::Idle,
                live_ms: 0,
                timed_out: true,
            };
        }

        // Tick can observe a slightly older clock reading than the event that
        // opened the phase; show 0 rather than a negative value.
        let live_ms = round_ms(elapsed).max(0) as u64;
        self.state.displays[segment] = live_ms;
        Tick {
            phase: self.state.phase,
            live_ms,
            timed_out: false,
        }
    }

    /// Force Idle and clear all boundaries and displays.
    pub fn reset(&mut self) {
        self.state = SegmentState::default();
    }

    /// Current frame for every segment
    pub fn frames(&self) -> [SegmentFrame; SEGMENT_COUNT] {
        let active = self.state.phase.segment_index();
        std::array::from_fn(|segment| SegmentFrame {
            segment,
            elapsed_ms: self.state.displays[segment],
            zone: self.zones[segment],
            active: active == Some(segment),
        })
    }

    /// Push every segment frame to a display
    pub fn present_to(&self, sink: &mut impl DisplaySink) {
        for frame in self.frames() {
            sink.present(frame);
        }
    }

    fn enter(&mut self, phase: Phase, ts: Millis) {
        self.state.phase = phase;
        self.state.phase_start = ts;
    }

    /// Close `segment` at `ts`. Out-of-order timestamps clamp to 0.
    fn freeze(&mut self, segment: usize, ts: Millis) -> CompletedSegment {
        let opened = self.state.boundaries[segment].unwrap_or(self.state.phase_start);
        let raw = round_ms(ts - opened);
        let duration_ms = if raw < 0 {
            log::warn!(
                "segment {} closed {} ms before it opened; recording 0",
                segment + 1,
                -raw
            );
            0
        } else {
            raw as u64
        };
        self.state.displays[segment] = duration_ms;
        log::debug!("segment {} frozen at {} ms", segment + 1, duration_ms);
        CompletedSegment {
            segment,
            duration_ms,
        }
    }
}

//! Segment timing driven by global key events
//!
//! A run is three consecutive segments. Releasing the start key opens
//! segment 1, each split-key press closes the current segment and opens the
//! next, and the end-key press closes segment 3. Pressing the start key at
//! any point aborts and clears the run.

mod machine;

pub use machine::{SegmentState, TimingMachine};

use crate::clock::Millis;
use crate::config::TimingZone;

/// Number of segments in a run
pub const SEGMENT_COUNT: usize = 3;

/// A non-idle phase older than this is reset on the next tick
pub const WATCHDOG_TIMEOUT_MS: Millis = 600_000.0;

/// Which part of a run is being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Segment1,
    Segment2,
    Segment3,
}

impl Phase {
    /// Zero-based index of the segment being timed, None when idle
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Segment1 => Some(0),
            Self::Segment2 => Some(1),
            Self::Segment3 => Some(2),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Segment1 => "Segment 1",
            Self::Segment2 => "Segment 2",
            Self::Segment3 => "Segment 3",
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::Idle
    }
}

/// The role a key plays under the current bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Start,
    Split,
    End,
}

/// A segment that just closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedSegment {
    /// Zero-based segment index
    pub segment: usize,
    /// Frozen duration, rounded to the nearest millisecond
    pub duration_ms: u64,
}

/// What a key event did to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Start key pressed: run aborted, everything cleared
    Reset,
    /// Start key released while idle: segment 1 running
    Armed,
    /// A segment closed
    Completed(CompletedSegment),
    /// No effect in the current phase
    Ignored,
}

/// Result of [`TimingMachine::submit_key_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Phase after the event
    pub phase: Phase,
    pub transition: Transition,
}

impl Outcome {
    /// The frozen segment, if this event closed one
    pub fn completed(&self) -> Option<CompletedSegment> {
        match self.transition {
            Transition::Completed(segment) => Some(segment),
            _ => None,
        }
    }
}

/// Result of [`TimingMachine::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Phase after the tick
    pub phase: Phase,
    /// Live elapsed time of the running segment, 0 when idle
    pub live_ms: u64,
    /// The watchdog reset the run on this tick
    pub timed_out: bool,
}

/// Everything a display needs to draw one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentFrame {
    /// Zero-based segment index
    pub segment: usize,
    /// Live value while running, frozen value once closed
    pub elapsed_ms: u64,
    /// Target window and bar scale
    pub zone: TimingZone,
    /// This segment is currently running
    pub active: bool,
}

/// Receives segment frames; never feeds back into timing state
pub trait DisplaySink {
    fn present(&mut self, frame: SegmentFrame);
}

/// Round a millisecond delta half away from zero
pub fn round_ms(delta: Millis) -> i64 {
    delta.round() as i64
}

//! Monotonic session clock
//!
//! Every timestamp the timer sees is expressed as fractional milliseconds
//! since the clock's origin. The origin is captured once at startup and never
//! moves, so readings never go backward.

use std::time::Instant;

/// Milliseconds since the clock origin
pub type Millis = f64;

/// Monotonic millisecond clock started at process start
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Start a clock whose origin is now
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Start a clock at a specific origin
    pub fn with_origin(origin: Instant) -> Self {
        Self { origin }
    }

    /// The instant readings are measured from
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Current reading
    pub fn now_ms(&self) -> Millis {
        self.ms_at(Instant::now())
    }

    /// Convert an instant captured elsewhere into a clock reading.
    ///
    /// Instants earlier than the origin read as 0.
    pub fn ms_at(&self, instant: Instant) -> Millis {
        instant.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

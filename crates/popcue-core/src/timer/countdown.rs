//! Shared urgency countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Ended
//!           ^  |
//!           |  v
//!          Paused
//! ```
//!
//! The controller only tracks seconds and its timer token. The trigger engine
//! decides what a tick means (persisting the remaining value, closing the urgency
//! bar when it reaches zero).

use serde::{Deserialize, Serialize};

use super::clock::{Clock, TimerToken};

/// Default countdown length: ten minutes.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10 * 60;

const TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownPhase {
    Idle,
    Running,
    Paused,
    Ended,
}

/// Persisted view of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    pub remaining_secs: u32,
    pub is_active: bool,
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Not running; nothing changed.
    Ignored,
    Running { remaining_secs: u32 },
    /// Reached zero on this tick. Reported exactly once.
    Ended,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    phase: CountdownPhase,
    remaining_secs: u32,
    token: Option<TimerToken>,
}

impl Countdown {
    pub fn new(initial_secs: u32) -> Self {
        Self {
            phase: CountdownPhase::Idle,
            remaining_secs: initial_secs,
            token: None,
        }
    }

    /// Idle controller carrying a remaining value read back from storage.
    pub fn restored(snapshot: CountdownSnapshot) -> Self {
        Self {
            phase: CountdownPhase::Idle,
            remaining_secs: snapshot.remaining_secs,
            token: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Running or paused: the countdown still owes ticks.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, CountdownPhase::Running | CountdownPhase::Paused)
    }

    pub fn owns(&self, token: TimerToken) -> bool {
        self.token == Some(token)
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot {
            remaining_secs: self.remaining_secs,
            is_active: self.is_active(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin ticking from the carried value, or from `initial_secs` if nothing is left.
    ///
    /// Returns false if the countdown was already active.
    pub fn start(&mut self, initial_secs: u32, clock: &mut dyn Clock) -> bool {
        if self.is_active() {
            return false;
        }
        if self.remaining_secs == 0 {
            self.remaining_secs = initial_secs;
        }
        self.begin(clock);
        true
    }

    /// Throw away the carried value and run again from `initial_secs`.
    pub fn restart(&mut self, initial_secs: u32, clock: &mut dyn Clock) {
        self.cancel_timer(clock);
        self.remaining_secs = initial_secs;
        self.begin(clock);
    }

    pub fn tick(&mut self, clock: &mut dyn Clock) -> CountdownTick {
        if self.phase != CountdownPhase::Running {
            return CountdownTick::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.cancel_timer(clock);
            self.phase = CountdownPhase::Ended;
            return CountdownTick::Ended;
        }
        CountdownTick::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    pub fn pause(&mut self, clock: &mut dyn Clock) -> bool {
        if self.phase != CountdownPhase::Running {
            return false;
        }
        if let Some(token) = self.token {
            clock.pause(token);
        }
        self.phase = CountdownPhase::Paused;
        true
    }

    pub fn resume(&mut self, clock: &mut dyn Clock) -> bool {
        if self.phase != CountdownPhase::Paused {
            return false;
        }
        if let Some(token) = self.token {
            clock.resume(token);
        }
        self.phase = CountdownPhase::Running;
        true
    }

    /// Early stop (the bar was closed). Keeps the remaining value and never
    /// reports an end. No-op once ended.
    pub fn stop(&mut self, clock: &mut dyn Clock) -> bool {
        if !self.is_active() {
            return false;
        }
        self.cancel_timer(clock);
        self.phase = CountdownPhase::Idle;
        true
    }

    fn begin(&mut self, clock: &mut dyn Clock) {
        self.token = Some(clock.schedule_repeating(TICK_INTERVAL_MS));
        self.phase = CountdownPhase::Running;
    }

    fn cancel_timer(&mut self, clock: &mut dyn Clock) {
        if let Some(token) = self.token.take() {
            clock.cancel(token);
        }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

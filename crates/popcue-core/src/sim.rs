//! Deterministic replay harness.
//!
//! Drives a [`TriggerEngine`] on a [`VirtualClock`]. Time only moves when the
//! harness advances it, and every timer that comes due on the way is delivered
//! as a `TimerFired` signal in deadline order.
//!
//! Scripts are JSON lines, one [`ScriptStep`] per line:
//!
//! ```text
//! # blank lines and lines starting with '#' are skipped
//! {"at_ms": 0, "type": "lifecycle", "state": "loaded"}
//! {"at_ms": 12000, "type": "cart_add"}
//! {"at_ms": 20000, "type": "pointer_exit", "client_y": -4}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::timer::{Clock, VirtualClock};
use crate::trigger::{Signal, TriggerEngine};

/// One input at an offset from the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub signal: Signal,
}

pub struct Simulation {
    engine: TriggerEngine<VirtualClock>,
    origin_ms: i64,
}

impl Simulation {
    pub fn new(engine: TriggerEngine<VirtualClock>) -> Self {
        let origin_ms = engine.clock().now_ms();
        Self { engine, origin_ms }
    }

    pub fn engine(&self) -> &TriggerEngine<VirtualClock> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TriggerEngine<VirtualClock> {
        &mut self.engine
    }

    pub fn into_engine(self) -> TriggerEngine<VirtualClock> {
        self.engine
    }

    /// Milliseconds since the harness was created.
    pub fn elapsed_ms(&self) -> u64 {
        (self.engine.clock().now_ms() - self.origin_ms).max(0) as u64
    }

    pub fn send(&mut self, signal: Signal) {
        self.engine.handle(signal);
    }

    /// Move the clock to the absolute time `target_ms`, firing due timers.
    ///
    /// Returns how many timer expiries were delivered.
    pub fn advance_to(&mut self, target_ms: i64) -> usize {
        let mut fired = 0;
        while let Some((deadline, token)) = self.engine.clock().next_due(target_ms) {
            let clock = self.engine.clock_mut();
            clock.set_now(deadline);
            if !clock.fire(token) {
                break;
            }
            self.engine.handle(Signal::TimerFired { token });
            fired += 1;
        }
        self.engine.clock_mut().set_now(target_ms);
        fired
    }

    pub fn advance(&mut self, ms: u64) -> usize {
        let target = self.engine.clock().now_ms().saturating_add(to_i64(ms));
        self.advance_to(target)
    }

    pub fn advance_secs(&mut self, secs: u64) -> usize {
        self.advance(secs.saturating_mul(1000))
    }

    /// Replay `steps`, advancing to each step's offset before delivering it.
    pub fn run_script(&mut self, steps: &[ScriptStep]) {
        for step in steps {
            self.advance_to(self.origin_ms.saturating_add(to_i64(step.at_ms)));
            self.engine.handle(step.signal.clone());
        }
    }
}

fn to_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Parse a JSON-lines script. Steps must be in non-decreasing `at_ms` order.
pub fn parse_script(input: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps: Vec<ScriptStep> = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: ScriptStep =
            serde_json::from_str(trimmed).map_err(|e| ScriptError::Malformed {
                line,
                message: e.to_string(),
            })?;
        if steps.last().is_some_and(|prev| prev.at_ms > step.at_ms) {
            return Err(ScriptError::OutOfOrder {
                line,
                at_ms: step.at_ms,
            });
        }
        steps.push(step);
    }
    Ok(steps)
}

//! Clock and timer port.
//!
//! The engine never holds raw timer handles. It asks a [`Clock`] for a
//! [`TimerToken`], and the host later hands the token back as
//! `Signal::TimerFired` when the deadline passes. Pausing a token keeps the
//! unexpired part of its delay so a resume continues where it stopped.
//!
//! [`VirtualClock`] is the deterministic implementation used by tests and by
//! the simulation driver: time only moves when someone calls `set_now`.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Opaque cancellation token for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Time source plus delayed/periodic callbacks.
pub trait Clock {
    /// Current time as milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Calendar date of `epoch_ms` in the local timezone.
    fn local_date(&self, epoch_ms: i64) -> NaiveDate {
        date_in(&chrono::Local, epoch_ms)
    }

    /// Fire once after `delay_ms`.
    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken;

    /// Fire every `interval_ms` until cancelled.
    fn schedule_repeating(&mut self, interval_ms: u64) -> TimerToken;

    /// Drop a pending timer. Unknown tokens are ignored.
    fn cancel(&mut self, token: TimerToken);

    /// Suspend a timer, keeping its remaining delay. Pausing twice is a no-op.
    fn pause(&mut self, token: TimerToken);

    /// Continue a paused timer from its remaining delay.
    fn resume(&mut self, token: TimerToken);
}

/// Calendar date of an instant in the given timezone.
pub fn date_in<Tz: TimeZone>(tz: &Tz, epoch_ms: i64) -> NaiveDate {
    match tz.timestamp_millis_opt(epoch_ms) {
        LocalResult::Single(dt) => dt.date_naive(),
        LocalResult::Ambiguous(earliest, _) => earliest.date_naive(),
        LocalResult::None => DateTime::<Utc>::from_timestamp_millis(epoch_ms)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN),
    }
}

#[derive(Debug, Clone)]
struct VirtualTimer {
    deadline_ms: i64,
    interval_ms: Option<u64>,
    /// Set while paused: the delay that was left when the pause happened.
    paused_remaining_ms: Option<u64>,
}

/// Manually driven clock with a fixed UTC offset standing in for local time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now_ms: i64,
    offset: FixedOffset,
    next_id: u64,
    timers: BTreeMap<TimerToken, VirtualTimer>,
}

impl VirtualClock {
    pub fn new(now_ms: i64, offset: FixedOffset) -> Self {
        Self {
            now_ms,
            offset,
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }

    /// Start the clock at a wall-clock instant, adopting its offset.
    pub fn starting_at(at: DateTime<FixedOffset>) -> Self {
        Self::new(at.timestamp_millis(), *at.offset())
    }

    /// UTC clock starting at the Unix epoch.
    pub fn utc_epoch() -> Self {
        Self::new(0, Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Move time to `now_ms`. Time never goes backwards.
    pub fn set_now(&mut self, now_ms: i64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Earliest unpaused timer due at or before `until_ms`, ties broken by token order.
    pub fn next_due(&self, until_ms: i64) -> Option<(i64, TimerToken)> {
        self.timers
            .iter()
            .filter(|(_, t)| t.paused_remaining_ms.is_none() && t.deadline_ms <= until_ms)
            .min_by_key(|(token, t)| (t.deadline_ms, **token))
            .map(|(token, t)| (t.deadline_ms, *token))
    }

    /// Consume one expiry: one-shots are removed, repeating timers move one interval on.
    ///
    /// Returns false if the token is not pending or is paused.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        let Some(timer) = self.timers.get_mut(&token) else {
            return false;
        };
        if timer.paused_remaining_ms.is_some() {
            return false;
        }
        match timer.interval_ms {
            Some(interval) => {
                timer.deadline_ms = timer.deadline_ms.saturating_add(interval as i64);
            }
            None => {
                self.timers.remove(&token);
            }
        }
        true
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.timers.contains_key(&token)
    }

    pub fn is_paused(&self, token: TimerToken) -> bool {
        self.timers
            .get(&token)
            .is_some_and(|t| t.paused_remaining_ms.is_some())
    }

    /// Delay left until the timer fires, counting paused time as frozen.
    pub fn remaining_ms(&self, token: TimerToken) -> Option<u64> {
        self.timers.get(&token).map(|t| match t.paused_remaining_ms {
            Some(left) => left,
            None => t.deadline_ms.saturating_sub(self.now_ms).max(0) as u64,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    fn insert(&mut self, delay_ms: u64, interval_ms: Option<u64>) -> TimerToken {
        let token = TimerToken::new(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            token,
            VirtualTimer {
                deadline_ms: self.now_ms.saturating_add(delay_ms as i64),
                interval_ms,
                paused_remaining_ms: None,
            },
        );
        token
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms
    }

    fn local_date(&self, epoch_ms: i64) -> NaiveDate {
        date_in(&self.offset, epoch_ms)
    }

    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken {
        self.insert(delay_ms, None)
    }

    fn schedule_repeating(&mut self, interval_ms: u64) -> TimerToken {
        // A zero interval would fire forever within a single instant.
        let interval = interval_ms.max(1);
        self.insert(interval, Some(interval))
    }

    fn cancel(&mut self, token: TimerToken) {
        self.timers.remove(&token);
    }

    fn pause(&mut self, token: TimerToken) {
        let now = self.now_ms;
        if let Some(timer) = self.timers.get_mut(&token) {
            if timer.paused_remaining_ms.is_none() {
                let left = timer.deadline_ms.saturating_sub(now).max(0) as u64;
                timer.paused_remaining_ms = Some(left);
            }
        }
    }

    fn resume(&mut self, token: TimerToken) {
        let now = self.now_ms;
        if let Some(timer) = self.timers.get_mut(&token) {
            if let Some(left) = timer.paused_remaining_ms.take() {
                timer.deadline_ms = now.saturating_add(left as i64);
            }
        }
    }
}

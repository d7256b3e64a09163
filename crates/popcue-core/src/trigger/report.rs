//! Interaction log plus the status and analytics views of the engine.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::kind::PopupKind;
use super::tracking::TrackingByKind;
use crate::timer::CountdownPhase;

/// The log holds at most this many entries...
const MAX_INTERACTIONS: usize = 100;
/// ...and keeps this many of the newest when it overflows.
const KEPT_INTERACTIONS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp_ms: i64,
}

/// Bounded record of visitor interactions.
#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    entries: VecDeque<Interaction>,
    total: u64,
}

impl InteractionLog {
    pub fn record(&mut self, kind: &str, timestamp_ms: i64) {
        self.entries.push_back(Interaction {
            kind: kind.to_string(),
            timestamp_ms,
        });
        self.total += 1;
        if self.entries.len() > MAX_INTERACTIONS {
            let excess = self.entries.len() - KEPT_INTERACTIONS;
            self.entries.drain(..excess);
        }
    }

    /// Interactions ever recorded, including trimmed ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownStatus {
    pub phase: CountdownPhase,
    pub is_active: bool,
    pub remaining_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub tracking: TrackingByKind,
    pub countdown: CountdownStatus,
    pub visible: Vec<PopupKind>,
    pub hidden: bool,
    pub total_interactions: u64,
    pub interactions: Vec<Interaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredFlags {
    pub welcome: bool,
    pub urgency: bool,
    pub exit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub session_duration_secs: i64,
    pub total_events: u64,
    pub user_interactions: usize,
    pub modules_triggered: TriggeredFlags,
    pub cart_added: bool,
    pub time_on_page_secs: u32,
}

/// Everything `export_json` writes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub analytics: Analytics,
    pub status: EngineStatus,
    pub timestamp_ms: i64,
}

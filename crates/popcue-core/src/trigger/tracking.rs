//! Per-kind tracking state and the trigger predicates.
//!
//! Predicates are pure: they read a [`TrackingState`] and the configured
//! thresholds and return whether the popup may show now.

use serde::{Deserialize, Serialize};

use super::kind::PopupKind;
use crate::storage::{UrgencyConfig, WelcomeConfig};

/// What the engine knows about one popup kind for the current day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    /// Shown at least once today. Only daily rollover or a manual reset clears it.
    #[serde(default)]
    pub has_triggered: bool,
    #[serde(default)]
    pub time_on_page_secs: u32,
    #[serde(default)]
    pub page_views: u32,
    #[serde(default)]
    pub has_added_to_cart: bool,
}

/// One [`TrackingState`] per [`PopupKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingByKind {
    pub welcome: TrackingState,
    pub urgency: TrackingState,
    pub exit: TrackingState,
}

impl TrackingByKind {
    pub fn get(&self, kind: PopupKind) -> &TrackingState {
        match kind {
            PopupKind::Welcome => &self.welcome,
            PopupKind::Urgency => &self.urgency,
            PopupKind::Exit => &self.exit,
        }
    }

    pub fn get_mut(&mut self, kind: PopupKind) -> &mut TrackingState {
        match kind {
            PopupKind::Welcome => &mut self.welcome,
            PopupKind::Urgency => &mut self.urgency,
            PopupKind::Exit => &mut self.exit,
        }
    }
}

/// `page_views >= 2` or time on page inside the `[15, 30]` window.
///
/// After the window closes only a second page view can qualify the popup.
pub fn welcome_eligible(state: &TrackingState, rules: &WelcomeConfig) -> bool {
    if state.has_triggered {
        return false;
    }
    let in_window = (rules.min_time_secs..=rules.max_time_secs).contains(&state.time_on_page_secs);
    state.page_views >= rules.min_page_views || in_window
}

/// `time_on_page >= 45` or something was added to the cart.
pub fn urgency_eligible(state: &TrackingState, rules: &UrgencyConfig) -> bool {
    if state.has_triggered {
        return false;
    }
    state.time_on_page_secs >= rules.min_time_secs || state.has_added_to_cart
}

pub fn exit_eligible(state: &TrackingState, signal_received: bool) -> bool {
    !state.has_triggered && signal_received
}

//! Inputs the engine consumes, abstracted from concrete browser events.

use serde::{Deserialize, Serialize};

use crate::timer::TimerToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLifecycle {
    Loaded,
    Hidden,
    Visible,
    Unloading,
}

/// One input event, delivered in arrival order.
///
/// Deserializes from tagged JSON, e.g. `{"type": "pointer_exit", "client_y": -3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    Lifecycle { state: PageLifecycle },
    PointerExit { client_y: f64 },
    TouchStart { scroll_y: f64 },
    Key { key: String },
    Scroll { scroll_y: f64 },
    CartAdd,
    TimerFired { token: TimerToken },
}

impl Signal {
    /// Interaction label recorded in the interaction log; `None` for
    /// lifecycle and timer plumbing.
    pub fn interaction(&self) -> Option<&'static str> {
        match self {
            Signal::PointerExit { .. } => Some("pointer_exit"),
            Signal::TouchStart { .. } => Some("touch_start"),
            Signal::Key { .. } => Some("key"),
            Signal::Scroll { .. } => Some("scroll"),
            Signal::CartAdd => Some("cart_add"),
            Signal::Lifecycle { .. } | Signal::TimerFired { .. } => None,
        }
    }
}

impl From<PageLifecycle> for Signal {
    fn from(state: PageLifecycle) -> Self {
        Signal::Lifecycle { state }
    }
}

/// Which heuristic inferred that the visitor is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitIntentSource {
    PointerLeftTop,
    TouchAtTop,
    EscapeKey,
    ScrolledToTop,
}

impl ExitIntentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitIntentSource::PointerLeftTop => "pointer_left_top",
            ExitIntentSource::TouchAtTop => "touch_at_top",
            ExitIntentSource::EscapeKey => "escape_key",
            ExitIntentSource::ScrolledToTop => "scrolled_to_top",
        }
    }
}

pub(crate) fn is_top_edge_exit(client_y: f64) -> bool {
    client_y <= 0.0
}

pub(crate) fn is_at_top(scroll_y: f64) -> bool {
    scroll_y <= 0.0
}

pub(crate) fn is_escape(key: &str) -> bool {
    key == "Escape"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_parse_from_tagged_json() {
        let s: Signal = serde_json::from_str(r#"{"type":"cart_add"}"#).unwrap();
        assert_eq!(s, Signal::CartAdd);

        let s: Signal = serde_json::from_str(r#"{"type":"lifecycle","state":"hidden"}"#).unwrap();
        assert_eq!(s, Signal::from(PageLifecycle::Hidden));

        let s: Signal = serde_json::from_str(r#"{"type":"pointer_exit","client_y":-2.0}"#).unwrap();
        assert_eq!(s, Signal::PointerExit { client_y: -2.0 });

        let s: Signal = serde_json::from_str(r#"{"type":"key","key":"Escape"}"#).unwrap();
        assert_eq!(s.interaction(), Some("key"));
    }

    #[test]
    fn exit_heuristics() {
        assert!(is_top_edge_exit(0.0));
        assert!(!is_top_edge_exit(12.0));
        assert!(is_at_top(0.0));
        assert!(!is_at_top(1.0));
        assert!(is_escape("Escape"));
        assert!(!is_escape("Esc"));
    }
}

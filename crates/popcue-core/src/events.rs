use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::trigger::PopupKind;

/// Every state transition in the engine produces an Event.
/// The sink receives them as [`EventRecord`]s with a stable analytics name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PopupShown {
        kind: PopupKind,
    },
    PopupClosed {
        kind: PopupKind,
    },
    /// Manual test reset of a single kind.
    TriggerReset {
        kind: PopupKind,
    },
    CountdownStarted {
        remaining_secs: u32,
    },
    /// Countdown picked up again after a reload.
    CountdownRestored {
        remaining_secs: u32,
    },
    CountdownEnded,
    /// Stored state belonged to another calendar day and was discarded.
    DailyReset {
        previous_date: Option<chrono::NaiveDate>,
    },
    SessionRestoreFailed {
        reason: String,
    },
    LineBindAttempted {
        kind: PopupKind,
    },
    CheckoutClicked,
    DiscountClaimed {
        email: String,
    },
}

impl Event {
    /// Analytics name, e.g. `welcome_popup_shown` or `countdown_ended`.
    pub fn name(&self) -> String {
        match self {
            Event::PopupShown { kind } => format!("{}_shown", kind.surface_name()),
            Event::PopupClosed { kind } => format!("{}_closed", kind.surface_name()),
            Event::TriggerReset { kind } => format!("{}_reset", kind.surface_name()),
            Event::CountdownStarted { .. } => "countdown_started".into(),
            Event::CountdownRestored { .. } => "countdown_restored".into(),
            Event::CountdownEnded => "countdown_ended".into(),
            Event::DailyReset { .. } => "daily_reset".into(),
            Event::SessionRestoreFailed { .. } => "session_restore_failed".into(),
            Event::LineBindAttempted { kind: PopupKind::Exit } => "line_bind_exit_attempted".into(),
            Event::LineBindAttempted { .. } => "line_bind_attempted".into(),
            Event::CheckoutClicked => "checkout_clicked".into(),
            Event::DiscountClaimed { .. } => "discount_claimed".into(),
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            Event::PopupShown { kind }
            | Event::PopupClosed { kind }
            | Event::TriggerReset { kind }
            | Event::LineBindAttempted { kind } => json!({ "kind": kind }),
            Event::CountdownStarted { remaining_secs }
            | Event::CountdownRestored { remaining_secs } => {
                json!({ "remaining_secs": remaining_secs })
            }
            Event::DailyReset { previous_date } => json!({ "previous_date": previous_date }),
            Event::SessionRestoreFailed { reason } => json!({ "reason": reason }),
            Event::DiscountClaimed { email } => json!({ "email": email }),
            Event::CountdownEnded | Event::CheckoutClicked => json!({}),
        }
    }
}

/// Where the event happened; stamped onto every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub url: String,
    pub user_agent: String,
}

/// Structured record handed to the [`EventSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    pub timestamp_ms: i64,
    pub payload: serde_json::Value,
    pub context_url: String,
    pub user_agent: String,
    pub session_id: Uuid,
}

impl EventRecord {
    pub fn new(event: &Event, timestamp_ms: i64, context: &PageContext, session_id: Uuid) -> Self {
        Self {
            name: event.name(),
            timestamp_ms,
            payload: event.payload(),
            context_url: context.url.clone(),
            user_agent: context.user_agent.clone(),
            session_id,
        }
    }
}

/// Receives every event the engine emits. Transport is the sink's business.
pub trait EventSink {
    fn emit(&mut self, record: &EventRecord);
}

/// Collects records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<EventRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.borrow().iter().map(|r| r.name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.records.borrow().iter().filter(|r| r.name == name).count()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, record: &EventRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}

/// Forwards records to `tracing` under the `popcue::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, record: &EventRecord) {
        tracing::info!(
            target: "popcue::events",
            name = %record.name,
            timestamp_ms = record.timestamp_ms,
            payload = %record.payload,
            url = %record.context_url,
            session_id = %record.session_id,
            "marketing event"
        );
    }
}

/// Delivers each record to every inner sink, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&mut self, record: &EventRecord) {
        for sink in &mut self.sinks {
            sink.emit(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_surface_prefix() {
        assert_eq!(
            Event::PopupShown { kind: PopupKind::Welcome }.name(),
            "welcome_popup_shown"
        );
        assert_eq!(
            Event::PopupShown { kind: PopupKind::Urgency }.name(),
            "urgency_bar_shown"
        );
        assert_eq!(
            Event::PopupClosed { kind: PopupKind::Exit }.name(),
            "exit_popup_closed"
        );
        assert_eq!(
            Event::LineBindAttempted { kind: PopupKind::Exit }.name(),
            "line_bind_exit_attempted"
        );
        assert_eq!(
            Event::LineBindAttempted { kind: PopupKind::Welcome }.name(),
            "line_bind_attempted"
        );
    }

    #[test]
    fn record_carries_context() {
        let context = PageContext {
            url: "https://shop.example/p/1".into(),
            user_agent: "test-agent".into(),
        };
        let session = Uuid::new_v4();
        let record = EventRecord::new(
            &Event::DiscountClaimed { email: "a@b.co".into() },
            42,
            &context,
            session,
        );
        assert_eq!(record.name, "discount_claimed");
        assert_eq!(record.payload["email"], "a@b.co");
        assert_eq!(record.context_url, "https://shop.example/p/1");
        assert_eq!(record.session_id, session);
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        let record = EventRecord::new(
            &Event::CountdownEnded,
            0,
            &PageContext::default(),
            Uuid::nil(),
        );
        writer.emit(&record);
        assert_eq!(sink.names(), vec!["countdown_ended".to_string()]);
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let mut fanout = FanoutSink::new().with(a.clone()).with(b.clone());
        let record = EventRecord::new(
            &Event::CheckoutClicked,
            0,
            &PageContext::default(),
            Uuid::nil(),
        );
        fanout.emit(&record);
        assert_eq!(a.count("checkout_clicked"), 1);
        assert_eq!(b.count("checkout_clicked"), 1);
    }
}

//! # Popcue Core Library
//!
//! Trigger engine for three storefront marketing surfaces: a welcome popup, an
//! urgency bar with a countdown, and an exit-intent popup. Each surface shows
//! at most once per visitor per calendar day.
//!
//! ## Architecture
//!
//! - **Trigger Engine**: A pull-style state machine. The host feeds page
//!   signals and timer expiries, and drains surface commands
//! - **Timer**: A `Clock` abstraction with token-based timers, plus the
//!   pausable countdown controller
//! - **Storage**: Session persistence (in-memory or SQLite) and TOML
//!   configuration
//! - **Events**: Analytics records delivered to pluggable sinks
//!
//! ## Key Components
//!
//! - [`TriggerEngine`]: Core trigger state machine
//! - [`Simulation`]: Deterministic replay on a [`VirtualClock`]
//! - [`SessionStore`]: Key-value persistence seam
//! - [`Config`]: Thresholds and storage settings

pub mod error;
pub mod events;
pub mod sim;
pub mod storage;
pub mod timer;
pub mod trigger;

pub use error::{ConfigError, CoreError, RestoreError, ScriptError, StoreError, ValidationError};
pub use events::{Event, EventRecord, EventSink, FanoutSink, MemorySink, PageContext, TracingSink};
pub use sim::{parse_script, ScriptStep, Simulation};
pub use storage::{Config, MemoryStore, SessionKeys, SessionSnapshot, SessionStore, SqliteStore};
pub use timer::{Clock, Countdown, CountdownPhase, CountdownSnapshot, TimerToken, VirtualClock};
pub use trigger::{
    ExitIntentSource, PageLifecycle, PopupKind, Signal, SurfaceAction, SurfaceCommand,
    TrackingState, TriggerEngine,
};

mod engine;
mod kind;
mod report;
mod signal;
mod tracking;

pub use engine::{is_valid_email, TriggerEngine};
pub use kind::{PopupKind, SurfaceAction, SurfaceCommand};
pub use report::{
    Analytics, CountdownStatus, EngineStatus, Export, Interaction, InteractionLog, TriggeredFlags,
};
pub use signal::{ExitIntentSource, PageLifecycle, Signal};
pub use tracking::{
    exit_eligible, urgency_eligible, welcome_eligible, TrackingByKind, TrackingState,
};

mod clock;
mod countdown;

pub use clock::{date_in, Clock, TimerToken, VirtualClock};
pub use countdown::{
    Countdown, CountdownPhase, CountdownSnapshot, CountdownTick, DEFAULT_COUNTDOWN_SECS,
};

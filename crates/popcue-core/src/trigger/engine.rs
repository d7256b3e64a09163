//! Trigger engine.
//!
//! Owns the tracking state of all three popup kinds, the shared countdown and
//! every timer token. It has no thread and no event loop of its own: the host
//! feeds [`Signal`]s (including `TimerFired` for tokens it was handed) and
//! drains [`SurfaceCommand`]s with [`TriggerEngine::take_commands`].
//!
//! ## Lifecycle
//!
//! ```text
//! new -> initialize -> (handle signals)* -> Unloading
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TriggerEngine::new(clock, Box::new(store), Box::new(sink), config);
//! engine.initialize();
//! // For every browser event or expired timer:
//! engine.handle(signal);
//! for command in engine.take_commands() { render(command); }
//! ```

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::kind::{PopupKind, SurfaceCommand};
use super::report::{
    Analytics, CountdownStatus, EngineStatus, Export, InteractionLog, TriggeredFlags,
};
use super::signal::{is_at_top, is_escape, is_top_edge_exit, ExitIntentSource, PageLifecycle, Signal};
use super::tracking::{
    exit_eligible, urgency_eligible, welcome_eligible, TrackingByKind, TrackingState,
};
use crate::error::ValidationError;
use crate::events::{Event, EventRecord, EventSink};
use crate::storage::{
    load_snapshot, save_countdown, save_snapshot, Config, SessionKeys, SessionSnapshot,
    SessionStore,
};
use crate::timer::{Clock, Countdown, CountdownTick, TimerToken};

const TRACKING_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    TrackingTick,
    WelcomeDelay,
    CountdownTick,
    ScrollDebounce,
    TouchDelay,
}

pub struct TriggerEngine<C: Clock> {
    clock: C,
    store: Box<dyn SessionStore>,
    sink: Box<dyn EventSink>,
    config: Config,
    keys: SessionKeys,
    rng: Pcg32,
    session_id: Uuid,
    initialized: bool,
    hidden: bool,
    started_at_ms: i64,
    /// Calendar day the current tracking state belongs to.
    session_date: NaiveDate,
    tracking: TrackingByKind,
    visible: [bool; 3],
    countdown: Countdown,
    tracking_tick: Option<TimerToken>,
    welcome_delay: Option<TimerToken>,
    welcome_delay_fired: bool,
    scroll_debounce: Option<TimerToken>,
    last_scroll_y: Option<f64>,
    touch_delay: Option<TimerToken>,
    /// Set when the first exit signal arrives, before the popup is shown.
    exit_latch: bool,
    commands: Vec<SurfaceCommand>,
    interactions: InteractionLog,
}

impl<C: Clock> TriggerEngine<C> {
    pub fn new(
        clock: C,
        store: Box<dyn SessionStore>,
        sink: Box<dyn EventSink>,
        config: Config,
    ) -> Self {
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        let now = clock.now_ms();
        let session_date = clock.local_date(now);
        Self {
            keys: SessionKeys::new(config.storage.key_prefix.clone()),
            countdown: Countdown::new(config.urgency.countdown_secs),
            rng: Pcg32::seed_from_u64(seed),
            config,
            clock,
            store,
            sink,
            session_id: Uuid::new_v4(),
            initialized: false,
            hidden: false,
            started_at_ms: now,
            session_date,
            tracking: TrackingByKind::default(),
            visible: [false; 3],
            tracking_tick: None,
            welcome_delay: None,
            welcome_delay_fired: false,
            scroll_debounce: None,
            last_scroll_y: None,
            touch_delay: None,
            exit_latch: false,
            commands: Vec::new(),
            interactions: InteractionLog::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn tracking(&self, kind: PopupKind) -> &TrackingState {
        self.tracking.get(kind)
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn is_visible(&self, kind: PopupKind) -> bool {
        self.visible[kind.index()]
    }

    pub fn exit_latched(&self) -> bool {
        self.exit_latch
    }

    pub fn tracking_tick_token(&self) -> Option<TimerToken> {
        self.tracking_tick
    }

    pub fn welcome_delay_token(&self) -> Option<TimerToken> {
        self.welcome_delay
    }

    /// Surface instructions issued since the last call, oldest first.
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tracking: self.tracking.clone(),
            countdown: self.countdown.snapshot(),
            saved_at_ms: self.clock.now_ms(),
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            tracking: self.tracking.clone(),
            countdown: CountdownStatus {
                phase: self.countdown.phase(),
                is_active: self.countdown.is_active(),
                remaining_secs: self.countdown.remaining_secs(),
            },
            visible: PopupKind::ALL
                .into_iter()
                .filter(|kind| self.is_visible(*kind))
                .collect(),
            hidden: self.hidden,
            total_interactions: self.interactions.total(),
            interactions: self.interactions.iter().cloned().collect(),
        }
    }

    pub fn analytics(&self) -> Analytics {
        Analytics {
            session_duration_secs: (self.clock.now_ms() - self.started_at_ms) / 1000,
            total_events: self.interactions.total(),
            user_interactions: self.interactions.len(),
            modules_triggered: TriggeredFlags {
                welcome: self.tracking.welcome.has_triggered,
                urgency: self.tracking.urgency.has_triggered,
                exit: self.tracking.exit.has_triggered,
            },
            cart_added: self.tracking.urgency.has_added_to_cart,
            time_on_page_secs: self.tracking.welcome.time_on_page_secs,
        }
    }

    /// Analytics and status as pretty JSON.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Export {
            analytics: self.analytics(),
            status: self.status(),
            timestamp_ms: self.clock.now_ms(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Restore from the store (if the snapshot is readable) and arm the timers.
    ///
    /// An unreadable snapshot is reported as `session_restore_failed` and
    /// replaced by fresh defaults.
    pub fn initialize(&mut self) {
        if self.initialized {
            debug!("engine already initialized");
            return;
        }
        let now = self.clock.now_ms();
        let restored = match load_snapshot(
            self.store.as_ref(),
            &self.keys,
            self.config.urgency.countdown_secs,
        ) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "discarding unreadable session snapshot");
                self.emit(Event::SessionRestoreFailed {
                    reason: err.to_string(),
                });
                None
            }
        };
        self.initialize_with(now, restored);
    }

    /// Initialize from an explicit snapshot instead of the store.
    pub fn initialize_with(&mut self, now_ms: i64, restored: Option<SessionSnapshot>) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.started_at_ms = now_ms;
        self.session_date = self.clock.local_date(now_ms);

        let mut resume_countdown = false;
        if let Some(snapshot) = restored {
            let saved_date = self.clock.local_date(snapshot.saved_at_ms);
            if saved_date == self.session_date {
                debug!(saved_at_ms = snapshot.saved_at_ms, "restoring same-day session");
                resume_countdown = snapshot.countdown.is_active
                    && snapshot.countdown.remaining_secs > 0
                    && snapshot.tracking.urgency.has_triggered;
                self.tracking = snapshot.tracking;
                self.countdown = Countdown::restored(snapshot.countdown);
            } else {
                info!(%saved_date, today = %self.session_date, "stored session is from another day");
                self.emit(Event::DailyReset {
                    previous_date: Some(saved_date),
                });
            }
        }

        let welcome = &mut self.tracking.welcome;
        welcome.page_views = welcome.page_views.saturating_add(1);

        self.arm_tracking_tick();
        if !self.tracking.welcome.has_triggered {
            self.arm_welcome_delay();
        }
        if resume_countdown {
            self.resume_restored_countdown();
        }
        self.persist_transition();
    }

    /// Dispatch one input signal.
    pub fn handle(&mut self, signal: Signal) {
        if !self.initialized && !matches!(signal, Signal::Lifecycle { .. }) {
            debug!(?signal, "ignoring signal before initialization");
            return;
        }
        self.roll_over_if_new_day();
        if let Some(interaction) = signal.interaction() {
            let now = self.clock.now_ms();
            self.interactions.record(interaction, now);
        }
        match signal {
            Signal::Lifecycle { state } => match state {
                PageLifecycle::Loaded => self.initialize(),
                PageLifecycle::Hidden => self.on_hidden(),
                PageLifecycle::Visible => self.on_visible(),
                PageLifecycle::Unloading => self.on_unloading(),
            },
            Signal::PointerExit { client_y } => {
                if is_top_edge_exit(client_y) {
                    self.on_exit_intent(ExitIntentSource::PointerLeftTop);
                }
            }
            Signal::TouchStart { scroll_y } => {
                if is_at_top(scroll_y) {
                    self.on_touch_at_top();
                }
            }
            Signal::Key { key } => {
                if is_escape(&key) {
                    self.on_exit_intent(ExitIntentSource::EscapeKey);
                }
            }
            Signal::Scroll { scroll_y } => self.on_scroll(scroll_y),
            Signal::CartAdd => self.on_add_to_cart(),
            Signal::TimerFired { token } => self.on_timer(token),
        }
    }

    /// Pause every running timer. Repeated calls are no-ops.
    pub fn on_hidden(&mut self) {
        if !self.initialized {
            // Timers armed by initialization start paused.
            self.hidden = true;
            return;
        }
        self.roll_over_if_new_day();
        if self.hidden {
            return;
        }
        self.hidden = true;
        for token in self.auxiliary_timers() {
            self.clock.pause(token);
        }
        self.countdown.pause(&mut self.clock);
        debug!("page hidden, timers paused");
        self.persist_best_effort();
    }

    /// Resume paused timers from their remaining delay.
    pub fn on_visible(&mut self) {
        if !self.initialized {
            self.hidden = false;
            return;
        }
        self.roll_over_if_new_day();
        if !self.hidden {
            return;
        }
        self.hidden = false;
        for token in self.auxiliary_timers() {
            self.clock.resume(token);
        }
        self.countdown.resume(&mut self.clock);
        if self.welcome_delay.is_none()
            && self.welcome_delay_fired
            && !self.tracking.welcome.has_triggered
        {
            self.arm_welcome_delay();
        }
        debug!("page visible, timers resumed");
    }

    pub fn on_unloading(&mut self) {
        self.roll_over_if_new_day();
        debug!("page unloading, saving session");
        self.persist_transition();
    }

    // ── Triggers ─────────────────────────────────────────────────────

    /// One visible second: count time on page, then evaluate welcome before
    /// urgency. At most one popup is shown per tick.
    pub fn on_second_tick(&mut self) {
        if self.roll_over_if_new_day() {
            return;
        }
        for kind in PopupKind::ALL {
            if kind.tracks_time_on_page() {
                let state = self.tracking.get_mut(kind);
                state.time_on_page_secs = state.time_on_page_secs.saturating_add(1);
            }
        }
        for kind in PopupKind::TIMED {
            if self.try_show(kind) {
                break;
            }
        }
    }

    pub fn on_add_to_cart(&mut self) {
        self.roll_over_if_new_day();
        self.tracking.urgency.has_added_to_cart = true;
        if !self.try_show(PopupKind::Urgency) {
            self.persist_best_effort();
        }
    }

    /// Show the exit popup for the first exit signal of the day.
    ///
    /// Returns true if this call showed the popup.
    pub fn on_exit_intent(&mut self, source: ExitIntentSource) -> bool {
        self.roll_over_if_new_day();
        if !self.latch_exit(source) {
            return false;
        }
        self.try_show(PopupKind::Exit)
    }

    /// Show `kind` unless it already triggered today. Urgency also starts the countdown.
    pub fn show(&mut self, kind: PopupKind) -> bool {
        self.roll_over_if_new_day();
        if self.tracking.get(kind).has_triggered {
            debug!(%kind, "already triggered today");
            return false;
        }
        self.tracking.get_mut(kind).has_triggered = true;
        if kind == PopupKind::Exit {
            self.exit_latch = true;
            self.cancel_timer(TimerPurpose::TouchDelay);
        }
        self.set_visible(kind, true);
        info!(%kind, "popup triggered");
        self.emit(Event::PopupShown { kind });
        if kind == PopupKind::Urgency {
            self.start_countdown();
        }
        self.persist_transition();
        true
    }

    /// Hide `kind`. Urgency also stops the countdown without ending it.
    ///
    /// Returns false if the surface was not visible.
    pub fn close(&mut self, kind: PopupKind) -> bool {
        self.roll_over_if_new_day();
        if !self.set_visible(kind, false) {
            debug!(%kind, "close ignored, surface not visible");
            return false;
        }
        if kind == PopupKind::Urgency {
            self.countdown.stop(&mut self.clock);
        }
        self.emit(Event::PopupClosed { kind });
        self.persist_transition();
        true
    }

    /// Test hook: allow `kind` to trigger again today.
    pub fn reset(&mut self, kind: PopupKind) {
        self.roll_over_if_new_day();
        self.tracking.get_mut(kind).has_triggered = false;
        self.close(kind);
        match kind {
            PopupKind::Welcome => {
                self.welcome_delay_fired = false;
                self.arm_welcome_delay();
            }
            PopupKind::Urgency => {
                self.countdown.stop(&mut self.clock);
            }
            PopupKind::Exit => {
                self.exit_latch = false;
                self.cancel_timer(TimerPurpose::TouchDelay);
                self.cancel_timer(TimerPurpose::ScrollDebounce);
            }
        }
        info!(%kind, "trigger reset");
        self.emit(Event::TriggerReset { kind });
        self.persist_transition();
    }

    pub fn show_all(&mut self) {
        for kind in PopupKind::ALL {
            self.show(kind);
        }
    }

    pub fn hide_all(&mut self) {
        for kind in PopupKind::ALL {
            self.close(kind);
        }
    }

    pub fn reset_all(&mut self) {
        for kind in PopupKind::ALL {
            self.reset(kind);
        }
    }

    /// Test hook: run the countdown again from its full length.
    pub fn reset_countdown(&mut self) {
        self.roll_over_if_new_day();
        self.countdown
            .restart(self.config.urgency.countdown_secs, &mut self.clock);
        if self.hidden {
            self.countdown.pause(&mut self.clock);
        }
        let remaining_secs = self.countdown.remaining_secs();
        self.emit(Event::CountdownStarted { remaining_secs });
        self.persist_countdown();
    }

    // ── Storefront actions ───────────────────────────────────────────

    pub fn bind_line(&mut self, kind: PopupKind) -> Result<(), ValidationError> {
        if kind == PopupKind::Urgency {
            return Err(ValidationError::UnsupportedAction {
                action: "bind_line".into(),
                kind: kind.to_string(),
            });
        }
        self.roll_over_if_new_day();
        self.emit(Event::LineBindAttempted { kind });
        self.close(kind);
        Ok(())
    }

    pub fn go_to_checkout(&mut self) {
        self.roll_over_if_new_day();
        self.emit(Event::CheckoutClicked);
        self.close(PopupKind::Urgency);
    }

    /// Record a discount claim from the exit popup.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] without touching any state if
    /// the address is malformed.
    pub fn claim_discount(&mut self, email: &str) -> Result<(), ValidationError> {
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
        self.roll_over_if_new_day();
        self.emit(Event::DiscountClaimed {
            email: email.to_string(),
        });
        self.close(PopupKind::Exit);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_eligible(&self, kind: PopupKind) -> bool {
        match kind {
            PopupKind::Welcome => welcome_eligible(&self.tracking.welcome, &self.config.welcome),
            PopupKind::Urgency => urgency_eligible(&self.tracking.urgency, &self.config.urgency),
            PopupKind::Exit => exit_eligible(&self.tracking.exit, self.exit_latch),
        }
    }

    fn try_show(&mut self, kind: PopupKind) -> bool {
        self.is_eligible(kind) && self.show(kind)
    }

    fn latch_exit(&mut self, source: ExitIntentSource) -> bool {
        if self.exit_latch || self.tracking.exit.has_triggered {
            debug!(source = source.as_str(), "exit intent already handled");
            return false;
        }
        self.exit_latch = true;
        debug!(source = source.as_str(), "exit intent latched");
        true
    }

    fn on_touch_at_top(&mut self) {
        if !self.latch_exit(ExitIntentSource::TouchAtTop) {
            return;
        }
        let token = self.schedule_once(self.config.exit.touch_delay_ms);
        self.touch_delay = Some(token);
    }

    fn on_scroll(&mut self, scroll_y: f64) {
        self.last_scroll_y = Some(scroll_y);
        self.cancel_timer(TimerPurpose::ScrollDebounce);
        if self.exit_latch || self.tracking.exit.has_triggered {
            return;
        }
        let token = self.schedule_once(self.config.exit.scroll_debounce_ms);
        self.scroll_debounce = Some(token);
    }

    fn on_timer(&mut self, token: TimerToken) {
        match self.purpose_of(token) {
            Some(TimerPurpose::TrackingTick) => self.on_second_tick(),
            Some(TimerPurpose::WelcomeDelay) => {
                self.welcome_delay = None;
                self.welcome_delay_fired = true;
                debug!("welcome delay elapsed");
                self.try_show(PopupKind::Welcome);
            }
            Some(TimerPurpose::CountdownTick) => self.on_countdown_tick(),
            Some(TimerPurpose::ScrollDebounce) => {
                self.scroll_debounce = None;
                if self.last_scroll_y.is_some_and(is_at_top) {
                    self.on_exit_intent(ExitIntentSource::ScrolledToTop);
                }
            }
            Some(TimerPurpose::TouchDelay) => {
                self.touch_delay = None;
                self.try_show(PopupKind::Exit);
            }
            None => debug!(token = token.id(), "ignoring stale timer"),
        }
    }

    fn on_countdown_tick(&mut self) {
        match self.countdown.tick(&mut self.clock) {
            CountdownTick::Ignored => {}
            CountdownTick::Running { .. } => self.persist_countdown(),
            CountdownTick::Ended => {
                self.persist_countdown();
                self.close(PopupKind::Urgency);
                info!("countdown ended");
                self.emit(Event::CountdownEnded);
            }
        }
    }

    fn start_countdown(&mut self) {
        if !self
            .countdown
            .start(self.config.urgency.countdown_secs, &mut self.clock)
        {
            return;
        }
        if self.hidden {
            self.countdown.pause(&mut self.clock);
        }
        let remaining_secs = self.countdown.remaining_secs();
        self.emit(Event::CountdownStarted { remaining_secs });
        self.persist_countdown();
    }

    fn resume_restored_countdown(&mut self) {
        self.set_visible(PopupKind::Urgency, true);
        if self
            .countdown
            .start(self.config.urgency.countdown_secs, &mut self.clock)
        {
            let remaining_secs = self.countdown.remaining_secs();
            if self.hidden {
                self.countdown.pause(&mut self.clock);
            }
            info!(remaining_secs, "resuming countdown from stored session");
            self.emit(Event::CountdownRestored { remaining_secs });
        }
    }

    /// Every public entry point calls this before touching state, so nothing
    /// from a previous day is ever saved under today's date.
    fn roll_over_if_new_day(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        let today = self.clock.local_date(self.clock.now_ms());
        if today == self.session_date {
            return false;
        }
        self.daily_reset(today);
        true
    }

    /// Midnight passed while the page stayed open: drop everything and start
    /// the new day with this page as its first view.
    fn daily_reset(&mut self, today: NaiveDate) {
        let previous = self.session_date;
        info!(%previous, %today, "calendar day changed, resetting trigger state");
        self.session_date = today;
        // Hide without saving; the only write below carries the fresh state.
        for kind in PopupKind::ALL {
            if self.set_visible(kind, false) {
                self.emit(Event::PopupClosed { kind });
            }
        }
        self.cancel_all_timers();
        self.tracking = TrackingByKind::default();
        self.tracking.welcome.page_views = 1;
        self.countdown = Countdown::new(self.config.urgency.countdown_secs);
        self.exit_latch = false;
        self.welcome_delay_fired = false;
        self.last_scroll_y = None;
        self.emit(Event::DailyReset {
            previous_date: Some(previous),
        });
        self.arm_tracking_tick();
        self.arm_welcome_delay();
        self.persist_transition();
    }

    fn purpose_of(&self, token: TimerToken) -> Option<TimerPurpose> {
        if self.countdown.owns(token) {
            return Some(TimerPurpose::CountdownTick);
        }
        let slot = Some(token);
        if self.tracking_tick == slot {
            Some(TimerPurpose::TrackingTick)
        } else if self.welcome_delay == slot {
            Some(TimerPurpose::WelcomeDelay)
        } else if self.scroll_debounce == slot {
            Some(TimerPurpose::ScrollDebounce)
        } else if self.touch_delay == slot {
            Some(TimerPurpose::TouchDelay)
        } else {
            None
        }
    }

    /// Timers other than the countdown, which pauses through its controller.
    fn auxiliary_timers(&self) -> Vec<TimerToken> {
        [
            self.tracking_tick,
            self.welcome_delay,
            self.scroll_debounce,
            self.touch_delay,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken {
        let token = self.clock.schedule_once(delay_ms);
        if self.hidden {
            self.clock.pause(token);
        }
        token
    }

    fn cancel_timer(&mut self, purpose: TimerPurpose) {
        let slot = match purpose {
            TimerPurpose::TrackingTick => self.tracking_tick.take(),
            TimerPurpose::WelcomeDelay => self.welcome_delay.take(),
            TimerPurpose::ScrollDebounce => self.scroll_debounce.take(),
            TimerPurpose::TouchDelay => self.touch_delay.take(),
            TimerPurpose::CountdownTick => {
                self.countdown.stop(&mut self.clock);
                None
            }
        };
        if let Some(token) = slot {
            self.clock.cancel(token);
        }
    }

    fn cancel_all_timers(&mut self) {
        self.cancel_timer(TimerPurpose::TrackingTick);
        self.cancel_timer(TimerPurpose::WelcomeDelay);
        self.cancel_timer(TimerPurpose::ScrollDebounce);
        self.cancel_timer(TimerPurpose::TouchDelay);
        self.cancel_timer(TimerPurpose::CountdownTick);
    }

    fn arm_tracking_tick(&mut self) {
        self.cancel_timer(TimerPurpose::TrackingTick);
        let token = self.clock.schedule_repeating(TRACKING_INTERVAL_MS);
        if self.hidden {
            self.clock.pause(token);
        }
        self.tracking_tick = Some(token);
    }

    fn arm_welcome_delay(&mut self) {
        self.cancel_timer(TimerPurpose::WelcomeDelay);
        let delay_ms = self.sample_welcome_delay_ms();
        debug!(delay_ms, "welcome delay armed");
        let token = self.schedule_once(delay_ms);
        self.welcome_delay = Some(token);
    }

    /// Uniform in `[delay_min_secs, delay_max_secs)`, millisecond resolution.
    fn sample_welcome_delay_ms(&mut self) -> u64 {
        let min = u64::from(self.config.welcome.delay_min_secs) * 1000;
        let max = u64::from(self.config.welcome.delay_max_secs) * 1000;
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    fn set_visible(&mut self, kind: PopupKind, visible: bool) -> bool {
        let slot = &mut self.visible[kind.index()];
        if *slot == visible {
            return false;
        }
        *slot = visible;
        self.commands.push(if visible {
            SurfaceCommand::show(kind)
        } else {
            SurfaceCommand::hide(kind)
        });
        true
    }

    fn emit(&mut self, event: Event) {
        let record = EventRecord::new(
            &event,
            self.clock.now_ms(),
            &self.config.page,
            self.session_id,
        );
        self.sink.emit(&record);
    }

    /// Trigger transitions must not lose `has_triggered`: one retry.
    fn persist_transition(&mut self) {
        let snapshot = self.snapshot();
        if let Err(first) = save_snapshot(self.store.as_mut(), &self.keys, &snapshot) {
            debug!(error = %first, "session save failed, retrying once");
            if let Err(err) = save_snapshot(self.store.as_mut(), &self.keys, &snapshot) {
                warn!(error = %err, "failed to persist trigger state");
            }
        }
    }

    fn persist_best_effort(&mut self) {
        let snapshot = self.snapshot();
        if let Err(err) = save_snapshot(self.store.as_mut(), &self.keys, &snapshot) {
            warn!(error = %err, "failed to persist session");
        }
    }

    fn persist_countdown(&mut self) {
        let now = self.clock.now_ms();
        if let Err(err) = save_countdown(
            self.store.as_mut(),
            &self.keys,
            self.countdown.snapshot(),
            now,
        ) {
            debug!(error = %err, "countdown save failed");
        }
    }
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    let bytes = domain.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'.' && i > 0 && i + 1 < bytes.len())
}

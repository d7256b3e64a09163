//! Integration tests for the trigger engine driven through the simulation
//! harness: page-view welcome, exit-intent heuristics, visibility pausing and
//! the interaction log.

use popcue_core::{
    Config, EventSink, FanoutSink, MemorySink, MemoryStore, PageContext, PageLifecycle,
    PopupKind, Signal, Simulation, SurfaceCommand, TriggerEngine, VirtualClock,
};

fn config() -> Config {
    Config {
        rng_seed: Some(42),
        ..Config::default()
    }
}

fn page_load(store: &MemoryStore, sink: &MemorySink, now_ms: i64) -> Simulation {
    let clock = VirtualClock::new(now_ms, chrono::FixedOffset::east_opt(0).unwrap());
    let engine = TriggerEngine::new(
        clock,
        Box::new(store.clone()),
        Box::new(sink.clone()),
        config(),
    );
    let mut sim = Simulation::new(engine);
    sim.send(PageLifecycle::Loaded.into());
    sim
}

#[test]
fn test_second_page_view_shows_welcome_on_first_tick() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let mut first = page_load(&store, &sink, 0);
    first.advance_secs(5);
    first.send(PageLifecycle::Unloading.into());
    assert_eq!(sink.count("welcome_popup_shown"), 0);

    let mut second = page_load(&store, &sink, 10_000);
    assert_eq!(second.engine().tracking(PopupKind::Welcome).page_views, 2);
    second.advance_secs(1);
    assert!(second.engine().is_visible(PopupKind::Welcome));
    assert_eq!(sink.count("welcome_popup_shown"), 1);
}

#[test]
fn test_welcome_not_repeated_on_reload() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let mut first = page_load(&store, &sink, 0);
    first.advance_secs(20);
    assert_eq!(sink.count("welcome_popup_shown"), 1);
    first.send(PageLifecycle::Unloading.into());

    let mut second = page_load(&store, &sink, 30_000);
    second.advance_secs(40);
    assert_eq!(sink.count("welcome_popup_shown"), 1);
    assert!(second.engine().tracking(PopupKind::Welcome).has_triggered);
}

#[test]
fn test_two_exit_signals_show_exit_popup_once() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    sim.send(Signal::TouchStart { scroll_y: 0.0 });
    sim.send(Signal::Key {
        key: "Escape".into(),
    });
    sim.send(Signal::PointerExit { client_y: -2.0 });
    assert_eq!(sink.count("exit_popup_shown"), 0);

    sim.advance(100);
    assert_eq!(sink.count("exit_popup_shown"), 1);
    assert!(sim.engine().is_visible(PopupKind::Exit));

    sim.send(Signal::Key {
        key: "Escape".into(),
    });
    sim.advance(1000);
    assert_eq!(sink.count("exit_popup_shown"), 1);
}

#[test]
fn test_touch_below_top_is_ignored() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    sim.send(Signal::TouchStart { scroll_y: 320.0 });
    sim.advance(500);
    assert!(!sim.engine().exit_latched());
    assert_eq!(sink.count("exit_popup_shown"), 0);
}

#[test]
fn test_scroll_to_top_triggers_after_debounce() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    sim.send(Signal::Scroll { scroll_y: 0.0 });
    sim.advance(499);
    assert_eq!(sink.count("exit_popup_shown"), 0);
    sim.advance(1);
    assert_eq!(sink.count("exit_popup_shown"), 1);
}

#[test]
fn test_scroll_away_before_debounce_cancels() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    sim.send(Signal::Scroll { scroll_y: 0.0 });
    sim.advance(300);
    sim.send(Signal::Scroll { scroll_y: 640.0 });
    sim.advance(2000);
    assert_eq!(sink.count("exit_popup_shown"), 0);
    assert!(!sim.engine().exit_latched());
}

#[test]
fn test_hidden_page_stops_counting_time() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);
    sim.advance_secs(3);

    let delay = sim.engine().welcome_delay_token().unwrap();
    let before = sim.engine().clock().remaining_ms(delay).unwrap();

    sim.send(PageLifecycle::Hidden.into());
    sim.send(PageLifecycle::Hidden.into());
    sim.advance_secs(60);
    assert_eq!(sim.engine().tracking(PopupKind::Welcome).time_on_page_secs, 3);
    assert!(sim.engine().clock().is_paused(delay));
    assert_eq!(sim.engine().clock().remaining_ms(delay), Some(before));
    assert_eq!(sink.count("welcome_popup_shown"), 0);

    sim.send(PageLifecycle::Visible.into());
    sim.advance_secs(1);
    assert_eq!(sim.engine().tracking(PopupKind::Welcome).time_on_page_secs, 4);
    assert!(!sim.engine().clock().is_paused(delay));
}

#[test]
fn test_page_loaded_in_background_tab_starts_paused() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut first = page_load(&store, &sink, 0);
    first.send(Signal::CartAdd);
    first.advance_secs(10);
    first.send(PageLifecycle::Unloading.into());
    drop(first);

    let clock = VirtualClock::new(20_000, chrono::FixedOffset::east_opt(0).unwrap());
    let engine = TriggerEngine::new(
        clock,
        Box::new(store.clone()),
        Box::new(sink.clone()),
        config(),
    );
    let mut sim = Simulation::new(engine);
    sim.send(PageLifecycle::Hidden.into());
    sim.send(PageLifecycle::Loaded.into());
    assert!(sim.engine().is_hidden());

    let tick = sim.engine().tracking_tick_token().unwrap();
    assert!(sim.engine().clock().is_paused(tick));
    let time_before = sim.engine().tracking(PopupKind::Urgency).time_on_page_secs;
    let remaining_before = sim.engine().countdown().remaining_secs();
    assert!(remaining_before > 0);

    sim.advance_secs(30);
    assert_eq!(
        sim.engine().tracking(PopupKind::Urgency).time_on_page_secs,
        time_before
    );
    assert_eq!(sim.engine().countdown().remaining_secs(), remaining_before);

    sim.send(PageLifecycle::Visible.into());
    sim.advance_secs(1);
    assert_eq!(
        sim.engine().tracking(PopupKind::Urgency).time_on_page_secs,
        time_before + 1
    );
    assert_eq!(sim.engine().countdown().remaining_secs(), remaining_before - 1);
}

#[test]
fn test_cart_add_shows_urgency_and_commands_are_drained() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    sim.send(Signal::CartAdd);
    let commands = sim.engine_mut().take_commands();
    assert_eq!(commands, vec![SurfaceCommand::show(PopupKind::Urgency)]);
    assert!(sim.engine_mut().take_commands().is_empty());

    sim.engine_mut().go_to_checkout();
    assert_eq!(
        sim.engine_mut().take_commands(),
        vec![SurfaceCommand::hide(PopupKind::Urgency)]
    );
}

#[test]
fn test_records_share_session_and_page_context() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let config = Config {
        page: PageContext {
            url: "https://shop.example/products/tea".into(),
            user_agent: "test-agent".into(),
        },
        ..config()
    };
    let mut engine = TriggerEngine::new(
        VirtualClock::utc_epoch(),
        Box::new(store),
        Box::new(sink.clone()),
        config,
    );
    engine.initialize();
    engine.show_all();

    let records = sink.records();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.session_id == engine.session_id()));
    assert!(records
        .iter()
        .all(|r| r.context_url == "https://shop.example/products/tea"));
    assert_eq!(records[0].payload["kind"], "welcome");
}

#[test]
fn test_fanout_delivers_to_every_sink() {
    let left = MemorySink::new();
    let right = MemorySink::new();
    let mut fanout = FanoutSink::new().with(left.clone()).with(right.clone());

    let record = popcue_core::EventRecord::new(
        &popcue_core::Event::CheckoutClicked,
        5,
        &PageContext::default(),
        uuid::Uuid::nil(),
    );
    fanout.emit(&record);
    assert_eq!(left.names(), vec!["checkout_clicked"]);
    assert_eq!(right.names(), vec!["checkout_clicked"]);
}

#[test]
fn test_interaction_log_counts_every_input() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);

    for y in 0..120 {
        sim.send(Signal::Scroll {
            scroll_y: f64::from(y) + 1.0,
        });
    }
    let status = sim.engine().status();
    assert_eq!(status.total_interactions, 120);
    assert!(status.interactions.len() <= 100);

    let analytics = sim.engine().analytics();
    assert_eq!(analytics.total_events, 120);
    assert!(!analytics.modules_triggered.exit);
}

#[test]
fn test_export_is_valid_json() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = page_load(&store, &sink, 0);
    sim.advance_secs(16);

    let json = sim.engine().export_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["analytics"]["modules_triggered"]["welcome"], true);
    assert_eq!(value["analytics"]["session_duration_secs"], 16);
    assert_eq!(value["status"]["visible"][0], "welcome");
}

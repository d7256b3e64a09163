//! Integration tests for the shared countdown: persistence across reloads,
//! ending, pausing with the page and restarting.

use popcue_core::{
    Config, CountdownPhase, MemorySink, MemoryStore, PageLifecycle, PopupKind, Signal,
    Simulation, SurfaceCommand, TriggerEngine, VirtualClock,
};

fn engine_at(store: &MemoryStore, sink: &MemorySink, now_ms: i64, config: Config) -> Simulation {
    let clock = VirtualClock::new(now_ms, chrono::FixedOffset::east_opt(0).unwrap());
    let engine = TriggerEngine::new(clock, Box::new(store.clone()), Box::new(sink.clone()), config);
    Simulation::new(engine)
}

fn seeded() -> Config {
    Config {
        rng_seed: Some(11),
        ..Config::default()
    }
}

#[test]
fn test_countdown_survives_reload_same_day() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let mut first = engine_at(&store, &sink, 0, seeded());
    first.send(PageLifecycle::Loaded.into());
    first.send(Signal::CartAdd);
    assert_eq!(first.engine().countdown().remaining_secs(), 600);

    first.advance_secs(37);
    assert_eq!(first.engine().countdown().remaining_secs(), 563);
    assert_eq!(store.raw("popcue.countdown.remaining").as_deref(), Some("563"));
    assert_eq!(store.raw("popcue.countdown.active").as_deref(), Some("true"));
    drop(first);

    sink.clear();
    let mut second = engine_at(&store, &sink, 37_000, seeded());
    second.send(PageLifecycle::Loaded.into());

    let countdown = second.engine().countdown();
    assert_eq!(countdown.phase(), CountdownPhase::Running);
    assert_eq!(countdown.remaining_secs(), 563);
    assert!(second.engine().is_visible(PopupKind::Urgency));
    assert_eq!(
        second.engine_mut().take_commands(),
        vec![SurfaceCommand::show(PopupKind::Urgency)]
    );
    assert_eq!(sink.count("urgency_bar_shown"), 0);
    assert_eq!(sink.count("countdown_restored"), 1);

    second.advance_secs(3);
    assert_eq!(second.engine().countdown().remaining_secs(), 560);
}

#[test]
fn test_closed_countdown_is_not_resumed_on_reload() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let mut first = engine_at(&store, &sink, 0, seeded());
    first.send(PageLifecycle::Loaded.into());
    first.send(Signal::CartAdd);
    first.advance_secs(5);
    first.engine_mut().close(PopupKind::Urgency);
    assert_eq!(store.raw("popcue.countdown.active").as_deref(), Some("false"));

    let mut second = engine_at(&store, &sink, 6_000, seeded());
    second.send(PageLifecycle::Loaded.into());
    assert!(!second.engine().is_visible(PopupKind::Urgency));
    assert_eq!(second.engine().countdown().phase(), CountdownPhase::Idle);
    assert_eq!(second.engine().countdown().remaining_secs(), 595);
}

#[test]
fn test_countdown_end_closes_bar_once() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut config = seeded();
    config.urgency.countdown_secs = 2;

    let mut sim = engine_at(&store, &sink, 0, config);
    sim.send(PageLifecycle::Loaded.into());
    sim.send(Signal::CartAdd);
    sim.advance_secs(2);

    assert_eq!(sim.engine().countdown().phase(), CountdownPhase::Ended);
    assert_eq!(sim.engine().countdown().remaining_secs(), 0);
    assert!(!sim.engine().is_visible(PopupKind::Urgency));
    assert_eq!(sink.count("urgency_bar_closed"), 1);
    assert_eq!(sink.count("countdown_ended"), 1);

    sim.advance_secs(10);
    assert_eq!(sink.count("urgency_bar_closed"), 1);
    assert_eq!(sink.count("countdown_ended"), 1);

    let names = sink.names();
    let closed = names.iter().position(|n| n == "urgency_bar_closed").unwrap();
    let ended = names.iter().position(|n| n == "countdown_ended").unwrap();
    assert!(closed < ended);
}

#[test]
fn test_hidden_page_keeps_partial_second() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = engine_at(&store, &sink, 0, seeded());
    sim.send(PageLifecycle::Loaded.into());
    sim.send(Signal::CartAdd);

    sim.advance(1_500);
    assert_eq!(sim.engine().countdown().remaining_secs(), 599);

    sim.send(PageLifecycle::Hidden.into());
    assert_eq!(sim.engine().countdown().phase(), CountdownPhase::Paused);
    sim.advance_secs(10);
    assert_eq!(sim.engine().countdown().remaining_secs(), 599);

    sim.send(PageLifecycle::Visible.into());
    sim.advance(499);
    assert_eq!(sim.engine().countdown().remaining_secs(), 599);
    sim.advance(1);
    assert_eq!(sim.engine().countdown().remaining_secs(), 598);
}

#[test]
fn test_reshow_after_reset_continues_remaining_time() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = engine_at(&store, &sink, 0, seeded());
    sim.send(PageLifecycle::Loaded.into());
    sim.send(Signal::CartAdd);
    sim.advance_secs(5);

    sim.engine_mut().reset(PopupKind::Urgency);
    assert_eq!(sim.engine().countdown().phase(), CountdownPhase::Idle);
    assert!(sim.engine_mut().show(PopupKind::Urgency));
    assert_eq!(sim.engine().countdown().remaining_secs(), 595);

    let started: Vec<_> = sink
        .records()
        .into_iter()
        .filter(|r| r.name == "countdown_started")
        .map(|r| r.payload["remaining_secs"].as_u64())
        .collect();
    assert_eq!(started, vec![Some(600), Some(595)]);
}

#[test]
fn test_reset_countdown_restarts_full_duration() {
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let mut sim = engine_at(&store, &sink, 0, seeded());
    sim.send(PageLifecycle::Loaded.into());
    sim.send(Signal::CartAdd);
    sim.advance_secs(42);

    sim.engine_mut().reset_countdown();
    assert_eq!(sim.engine().countdown().remaining_secs(), 600);
    assert_eq!(sim.engine().countdown().phase(), CountdownPhase::Running);
    sim.advance_secs(1);
    assert_eq!(sim.engine().countdown().remaining_secs(), 599);
}

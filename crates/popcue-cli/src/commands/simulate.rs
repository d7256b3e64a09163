use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use clap::Args;
use popcue_core::{
    parse_script, Clock, Config, EventRecord, EventSink, FanoutSink, MemoryStore, PageLifecycle,
    SessionStore, Signal, Simulation, SqliteStore, SurfaceCommand, TracingSink, TriggerEngine,
    VirtualClock,
};
use serde::Serialize;
use tracing::debug;

#[derive(Args)]
pub struct SimulateArgs {
    /// Script file with one JSON step per line ("-" reads stdin)
    script: PathBuf,
    /// Keep the clock running until this many seconds after the start
    #[arg(long)]
    until: Option<u64>,
    /// Persist the session in this database instead of memory
    #[arg(long)]
    db: Option<PathBuf>,
    /// Print events and commands as JSON lines
    #[arg(long)]
    json: bool,
    /// Virtual start time, RFC 3339 (defaults to now in the local timezone)
    #[arg(long)]
    start: Option<String>,
}

/// Prints every record relative to the start of the run.
struct ConsoleSink {
    origin_ms: i64,
    json: bool,
}

#[derive(Serialize)]
struct EventLine<'a> {
    at_secs: f64,
    event: &'a EventRecord,
}

#[derive(Serialize)]
struct CommandLine<'a> {
    at_secs: f64,
    command: &'a SurfaceCommand,
}

fn secs_since(origin_ms: i64, now_ms: i64) -> f64 {
    (now_ms - origin_ms) as f64 / 1000.0
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, record: &EventRecord) {
        let at_secs = secs_since(self.origin_ms, record.timestamp_ms);
        if self.json {
            let line = EventLine {
                at_secs,
                event: record,
            };
            match serde_json::to_string(&line) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("error: cannot encode event: {e}"),
            }
        } else {
            println!("{} @ {at_secs:.3}s", record.name);
        }
    }
}

fn print_commands(sim: &mut Simulation, origin_ms: i64, json: bool) -> serde_json::Result<()> {
    let at_secs = secs_since(origin_ms, sim.engine().clock().now_ms());
    for command in sim.engine_mut().take_commands() {
        if json {
            let line = CommandLine {
                at_secs,
                command: &command,
            };
            println!("{}", serde_json::to_string(&line)?);
        } else {
            let verb = match command.action {
                popcue_core::SurfaceAction::Show => "show",
                popcue_core::SurfaceAction::Hide => "hide",
            };
            println!("> {verb} {} @ {at_secs:.3}s", command.kind.surface_name());
        }
    }
    Ok(())
}

fn read_script(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let steps = parse_script(&read_script(&args.script)?)?;
    let config = Config::load_or_default();

    let start: DateTime<FixedOffset> = match &args.start {
        Some(raw) => DateTime::parse_from_rfc3339(raw)?,
        None => Local::now().fixed_offset(),
    };
    let clock = VirtualClock::starting_at(start);
    let origin_ms = clock.now_ms();

    let store: Box<dyn SessionStore> = match &args.db {
        Some(path) => Box::new(SqliteStore::open(path)?),
        None => Box::new(MemoryStore::new()),
    };
    let sink = FanoutSink::new().with(TracingSink).with(ConsoleSink {
        origin_ms,
        json: args.json,
    });
    let engine = TriggerEngine::new(clock, store, Box::new(sink), config);
    let mut sim = Simulation::new(engine);

    // Scripts may leave the page load implicit.
    let loads_page = steps.iter().any(|step| {
        step.signal
            == Signal::Lifecycle {
                state: PageLifecycle::Loaded,
            }
    });
    if !loads_page {
        sim.send(PageLifecycle::Loaded.into());
        print_commands(&mut sim, origin_ms, args.json)?;
    }

    debug!(steps = steps.len(), "replaying script");
    for step in &steps {
        let at_ms = origin_ms.saturating_add(i64::try_from(step.at_ms)?);
        sim.advance_to(at_ms);
        print_commands(&mut sim, origin_ms, args.json)?;
        sim.send(step.signal.clone());
        print_commands(&mut sim, origin_ms, args.json)?;
    }
    if let Some(until) = args.until {
        let until_ms = i64::try_from(until.saturating_mul(1000))?;
        sim.advance_to(origin_ms.saturating_add(until_ms));
        print_commands(&mut sim, origin_ms, args.json)?;
    }

    let status = sim.engine().status();
    if args.json {
        println!("{}", serde_json::to_string(&serde_json::json!({ "status": status }))?);
    } else {
        println!("--- status ---");
        println!("{}", serde_json::to_string_pretty(&status)?);
    }
    Ok(())
}

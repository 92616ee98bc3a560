use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use sentinel_alerts::AlertQuery;
use sentinel_clock::StreamClock;
use sentinel_engine::{EngineConfig, IngestStatus, LogAlertSink, SurveillanceEngine};
use sentinel_normalizer::decode;

fn print_help() {
    eprintln!(
        r#"Sentinel Replay - run recorded trade events through the surveillance engine

USAGE:
    sentinel-replay [OPTIONS] <EVENTS>

ARGS:
    <EVENTS>            JSON-lines file, one raw trade event per line

OPTIONS:
    --config <PATH>     Load engine configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

Resulting alerts are written to stdout as a JSON array, oldest first.
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut events_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg if events_path.is_none() && !arg.starts_with('-') => {
                events_path = Some(arg.to_string());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(events_path) = events_path else {
        print_help();
        std::process::exit(1);
    };

    let mut config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            EngineConfig::from_file(&path)?
        }
        None => EngineConfig::default(),
    };
    // Recorded streams carry their own time
    config.pipeline.sweep_uses_event_time = true;

    let clock = StreamClock::new(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    let engine = SurveillanceEngine::start(config, Arc::new(LogAlertSink), clock.clone())?;

    let file = std::fs::File::open(&events_path)?;
    let (mut accepted, mut rejected) = (0usize, 0usize);
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw = match decode(line.as_bytes()) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Line {}: {}", line_no + 1, e);
                rejected += 1;
                continue;
            }
        };
        if let Ok(at) = raw.resolve_timestamp() {
            clock.observe(at);
        }

        let mut status = IngestStatus::from(engine.submit(raw.clone()));
        if status == IngestStatus::Overloaded {
            // Replays can wait for the queue instead of shedding
            engine.drain().await;
            status = IngestStatus::from(engine.submit(raw));
        }
        match status {
            IngestStatus::Accepted(_) => accepted += 1,
            IngestStatus::Rejected(e) => {
                log::warn!("Line {}: {}", line_no + 1, e);
                rejected += 1;
            }
            IngestStatus::Overloaded | IngestStatus::ShuttingDown => rejected += 1,
        }
    }

    engine.drain().await;
    engine.sweep_now();

    let mut alerts = engine.query().search_alerts(&AlertQuery::default());
    alerts.reverse();
    let stats = engine.stats();
    log::info!(
        "Replayed {} events ({} rejected): {} findings, {} alerts",
        accepted,
        rejected,
        stats.findings,
        alerts.len()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &alerts)?;
    writeln!(out)?;

    engine.shutdown().await;
    Ok(())
}

//! Endoscope washer host entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  main thread (interactive surface)                           │
//! │    stdin lines ──▶ "stop" → CancelFlag   y/n → gate answers  │
//! │    ChannelEventSink rx ──▶ status line + LogEventSink        │
//! │                                                              │
//! │  ─────────────── RunHandle (stop / join) ─────────────────   │
//! │                                                              │
//! │  worker thread                                               │
//! │    WasherService::run ── DigitalIo (rppal or simulator)      │
//! │                       └─ JsonHistoryStore, LogReportSink     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use endowasher::adapters::channel_sink::ChannelEventSink;
use endowasher::adapters::gate::{AutoConfirm, ChannelGate, GateEndpoint};
use endowasher::adapters::history::JsonHistoryStore;
use endowasher::adapters::log_sink::{LogEventSink, LogReportSink};
use endowasher::adapters::sim_io::SimulatedIo;
use endowasher::adapters::time::SystemClock;
use endowasher::adapters::probe_backend;
use endowasher::app::commands::RunRequest;
use endowasher::app::events::WashEvent;
use endowasher::app::ports::{Clock, Confirmation, DigitalIo, EventSink, OperatorGate};
use endowasher::app::service::WasherService;
use endowasher::app::worker::{WorkerPorts, spawn_run};
use endowasher::config::WasherConfig;
use endowasher::phase::{MIN_DURATION_MINUTES, Phase, PhaseSetting};

const USAGE: &str = "\
usage: endowasher [options]

  --config <file>          JSON configuration (defaults if omitted)
  --operator <id>          operator ID (prompted if omitted)
  --scope <id>             endoscope ID (prompted if omitted)
  --phase <name>[=<min>]   select a phase; repeatable
                           names: detergent-wash, rinsing, disinfecting,
                                  final-rinse, air-flush
  --simulate               use the simulator even if GPIO is available
  --yes                    confirm every operator prompt automatically
  -h, --help               show this text

While running, type `stop` to abort; answer prompts with y or n.";

/// Surface refresh interval.
const UI_POLL: Duration = Duration::from_millis(100);

// ── Command line ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    operator: Option<String>,
    scope: Option<String>,
    phases: Vec<PhaseSetting>,
    simulate: bool,
    yes: bool,
    help: bool,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut out = Self::default();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{flag} needs a value"));
            match arg.as_str() {
                "--config" => out.config = Some(PathBuf::from(value("--config")?)),
                "--operator" => out.operator = Some(value("--operator")?),
                "--scope" => out.scope = Some(value("--scope")?),
                "--phase" => out.phases.push(parse_phase(&value("--phase")?)?),
                "--simulate" => out.simulate = true,
                "--yes" | "-y" => out.yes = true,
                "--help" | "-h" => out.help = true,
                other => bail!("unknown argument `{other}`"),
            }
        }
        Ok(out)
    }
}

fn parse_phase(arg: &str) -> Result<PhaseSetting> {
    let (name, minutes) = match arg.split_once('=') {
        Some((name, minutes)) => (
            name,
            minutes
                .trim()
                .parse::<u8>()
                .with_context(|| format!("bad duration in `{arg}`"))?,
        ),
        None => (arg, MIN_DURATION_MINUTES),
    };
    let phase = Phase::from_slug(name).ok_or_else(|| anyhow!("unknown phase `{name}`"))?;
    Ok(PhaseSetting::new(phase, minutes))
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn parse_answer(line: &str) -> Option<Confirmation> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(Confirmation::Proceed),
        "n" | "no" => Some(Confirmation::Declined),
        _ => None,
    }
}

// ── Console gate (used before the worker owns stdin) ──────────

struct ConsoleGate;

impl OperatorGate for ConsoleGate {
    fn confirm(&mut self, message: &str) -> Confirmation {
        println!("{message} [Y/n]");
        loop {
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => return Confirmation::Cancelled,
                Ok(_) => {
                    if let Some(answer) = parse_answer(&line) {
                        return answer;
                    }
                    println!("please answer y or n");
                }
            }
        }
    }
}

/// Run the sensor self-test.  The pins are released unless the operator
/// confirmed the start.
fn preflight_or_release<IO: DigitalIo, C: Clock + Clone>(
    service: &mut WasherService<IO, C>,
    gate: &mut dyn OperatorGate,
) -> Result<bool> {
    match service.preflight(gate) {
        Ok(report) if report.confirmed => Ok(true),
        Ok(_) => {
            info!("run not started");
            service.release();
            Ok(false)
        }
        Err(fault) => {
            service.release();
            Err(endowasher::Error::from(fault).into())
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => WasherConfig::load(path)
            .map_err(endowasher::Error::from)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WasherConfig::default(),
    };

    let operator = match args.operator {
        Some(id) => id,
        None => prompt_line("Operator ID")?,
    };
    let scope = match args.scope {
        Some(id) => id,
        None => prompt_line("Scope ID")?,
    };
    let request = RunRequest {
        operator_id: operator,
        scope_id: scope,
        phases: args.phases,
    };
    request.validate().map_err(endowasher::Error::from)?;

    let io: Box<dyn DigitalIo + Send> = if args.simulate {
        info!("gpio: simulated backend (forced)");
        Box::new(SimulatedIo::new())
    } else {
        probe_backend(&config)
    };
    let mut service = WasherService::new(io, SystemClock::new(), &config);

    let confirmed = if args.yes {
        preflight_or_release(&mut service, &mut AutoConfirm)?
    } else {
        preflight_or_release(&mut service, &mut ConsoleGate)?
    };
    if !confirmed {
        return Ok(());
    }

    let cancel = service.cancel_flag();
    let (events, event_rx) = ChannelEventSink::new();
    let (gate, endpoint): (Box<dyn OperatorGate + Send>, Option<GateEndpoint>) = if args.yes {
        (Box::new(AutoConfirm), None)
    } else {
        let (gate, endpoint) = ChannelGate::new(cancel.clone());
        (Box::new(gate), Some(endpoint))
    };

    let handle = spawn_run(
        service,
        request,
        WorkerPorts {
            events: Box::new(events),
            gate,
            records: Box::new(JsonHistoryStore::new(&config.history_dir)),
            reports: Box::new(LogReportSink),
        },
    );
    println!("Running. Type `stop` and press Enter to abort.");

    let lines = spawn_stdin_reader();
    let mut log_sink = LogEventSink::new();
    let mut show = |event: WashEvent| {
        log_sink.emit(&event);
        if let Some(phase) = event.phase() {
            println!("[{phase}] {event}");
        } else {
            println!("{event}");
        }
    };

    loop {
        while let Ok(event) = event_rx.try_recv() {
            show(event);
        }
        if let Some(endpoint) = &endpoint {
            while let Ok(prompt) = endpoint.prompts.try_recv() {
                println!(">> {prompt} [Y/n]");
            }
        }
        while let Ok(line) = lines.try_recv() {
            if line.trim().eq_ignore_ascii_case("stop") {
                warn!("stop requested by operator");
                handle.stop();
                continue;
            }
            match (&endpoint, parse_answer(&line)) {
                (Some(endpoint), Some(answer)) => {
                    if endpoint.answers.send(answer).is_err() {
                        warn!("gate closed; answer ignored");
                    }
                }
                _ => println!("type `stop` to abort the run"),
            }
        }
        if handle.is_finished() {
            break;
        }
        thread::sleep(UI_POLL);
    }

    let (mut service, outcome) = handle.join()?;
    while let Ok(event) = event_rx.try_recv() {
        show(event);
    }
    service.release();

    let record = outcome.map_err(endowasher::Error::from)?;
    println!("{}", record.text_report());
    if record.status.is_failure() {
        bail!("run ended with {}", record.status);
    }
    Ok(())
}

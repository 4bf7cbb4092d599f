use crate::host::TerminalHost;
use anyhow::{Context, Result};
use clap::Parser;
use iatex_core::Side;
use iatex_experiment::{
    BlockRecord, ExperimentStateMachine, InputModality, RawInput, TaskConfig,
};
use iatex_timing::{HighPrecisionTimer, Timer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one IAT task in the terminal, one key or tap per stdin line.
#[derive(Debug, Parser)]
#[command(name = "iatex", about = "Headless IAT task runner")]
pub struct Args {
    /// Task configuration (JSON).
    pub config: PathBuf,
    #[arg(long, default_value = "results.json")]
    pub out: PathBuf,
    /// Values persisted by earlier tasks, e.g. a shared first combination.
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Read `l`/`r` taps instead of key codes.
    #[arg(long)]
    pub mobile: bool,
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    store: &'a BTreeMap<String, String>,
    blocks: &'a [BlockRecord],
}

/// Maps one stdin line to a raw input.
fn raw_input(line: &str, mobile: bool) -> Option<RawInput> {
    let token = line.trim();
    if mobile {
        return match token.to_ascii_lowercase().as_str() {
            "l" | "left" => Some(RawInput::Tap(Side::Left)),
            "r" | "right" => Some(RawInput::Tap(Side::Right)),
            _ => None,
        };
    }
    let code = match token.to_ascii_lowercase().as_str() {
        "" | "space" => "Space".to_string(),
        "f" => "KeyF".to_string(),
        "j" => "KeyJ".to_string(),
        _ => token.to_string(),
    };
    Some(RawInput::Key(code))
}

fn spawn_stdin() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn load_store(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing store {}", path.display()))
}

pub fn run(args: Args) -> Result<()> {
    let file = File::open(&args.config)
        .with_context(|| format!("opening {}", args.config.display()))?;
    let config = TaskConfig::from_reader(BufReader::new(file))
        .with_context(|| format!("loading task config {}", args.config.display()))?;

    let image_root = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let host = TerminalHost::new(image_root, load_store(args.store.as_deref())?);
    let modality = if args.mobile {
        InputModality::Mobile
    } else {
        InputModality::Desktop(config.keys.clone())
    };
    let timer = HighPrecisionTimer::new();
    let mut machine =
        ExperimentStateMachine::new(config, modality, timer.clone(), rand::rng(), host)?;

    let input = spawn_stdin();
    machine.start();
    info!(config = %args.config.display(), mobile = args.mobile, "session running");

    let mut input_closed = false;
    while !machine.is_terminated() {
        for id in std::mem::take(&mut machine.host_mut().completed) {
            machine.image_loaded(&id);
        }
        loop {
            match input.try_recv() {
                Ok(line) => {
                    if let Some(raw) = raw_input(&line, args.mobile) {
                        machine.handle_raw(&raw);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    input_closed = true;
                    break;
                }
            }
        }
        machine.update();
        if input_closed && machine.next_deadline().is_none() && !machine.is_terminated() {
            warn!(phase = ?machine.phase(), "input closed before the task finished");
            break;
        }
        timer.sleep(Duration::from_millis(1));
    }

    let output = SessionOutput {
        store: &machine.host().store,
        blocks: &machine.state().records,
    };
    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("writing {}", args.out.display()))?;
    println!("Results written to {}", args.out.display());
    Ok(())
}

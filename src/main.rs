use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cbcgrade::{config, ipc};

#[derive(Debug, Parser)]
#[command(
    name = "cbcgraded",
    version,
    about = "CBC performance-scale sidecar (JSON lines over stdin/stdout)"
)]
struct Cli {
    /// TOML preset with [weights] and [[scales]] to register at startup.
    #[arg(long, env = "CBCGRADE_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    // stdout carries replies; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    let mut state = ipc::AppState::from_config(cfg);
    log::info!(
        "cbcgraded {} ready with {} scale(s)",
        env!("CARGO_PKG_VERSION"),
        state.scales.len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // Can't echo an id we couldn't parse.
            Err(e) => ipc::err("", "bad_json", e.to_string(), None),
        };
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}

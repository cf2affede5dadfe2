mod backup;
mod calc;
mod config;
mod db;
mod ipc;
mod model;
mod records;
mod report;
mod roster;
mod sheets;

use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(cfg: &config::Config) {
    // stdout carries the IPC stream; logs go to stderr.
    let filter = EnvFilter::try_new(cfg.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn main() {
    let (cfg, cfg_warning) = config::Config::load();
    init_logging(&cfg);
    if let Some(w) = cfg_warning {
        warn!("{w}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "simasd starting");

    let startup_workspace = cfg.workspace.clone();
    let mut state = ipc::AppState::new(cfg);
    if let Some(path) = startup_workspace {
        if let Err(e) = state.open_workspace(&path) {
            warn!(workspace = %path.to_string_lossy(), "startup workspace not opened: {e:#}");
        }
    }

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

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, exiting");
}

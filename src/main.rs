mod backup;
mod calc;
mod config;
mod db;
mod error;
mod ipc;
mod reports;
mod store;

use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

fn write_response(out: &mut impl Write, resp: &Value) {
    if let Err(e) = writeln!(out, "{}", resp).and_then(|_| out.flush()) {
        tracing::error!(error = %e, "failed to write response");
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let cfg = config::Config::load(&args);
    config::setup_logging(&cfg);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradebookd starting");

    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace {
        // A bad startup workspace leaves the sidecar usable; clients can still select one.
        let shown = path.display().to_string();
        match state.open_workspace(path) {
            Ok(()) => tracing::info!(workspace = %shown, "workspace preselected"),
            Err(e) => tracing::error!(workspace = %shown, error = %e, "failed to open workspace"),
        }
    }

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) if l.trim().is_empty() => continue,
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // No id to echo back.
            Err(e) => {
                tracing::warn!(error = %e, "malformed request line");
                json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                })
            }
        };
        write_response(&mut stdout, &resp);
    }

    tracing::info!("stdin closed, gradebookd stopping");
}

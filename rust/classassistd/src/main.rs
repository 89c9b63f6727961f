mod auth;
mod config;
mod db;
mod http;
mod ipc;
mod list_state;
mod model;
mod session;
mod store;
mod views;

use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the protocol; logs go to stderr.
    let filter = config::LogConfig::from_env().filter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_ansi(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let mut state = ipc::AppState::new();
    match config::BackendConfig::from_env() {
        Ok(Some(cfg)) => {
            if let Err(e) = state.install_backend(cfg) {
                tracing::warn!(error = %e, "backend unavailable, using local storage");
            }
        }
        Ok(None) => tracing::info!("no backend configured, using local storage"),
        Err(e) => tracing::warn!(error = %e, "ignoring invalid backend config"),
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

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                tracing::debug!(id = %req.id, method = %req.method, "request");
                ipc::handle_request(&mut state, req)
            }
            // Can't echo an id we failed to parse.
            Err(e) => ipc::err("", "bad_json", e.to_string(), None),
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.close_dashboard();
}

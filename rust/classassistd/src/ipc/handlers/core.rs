use super::required_str;
use crate::config::BackendConfig;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{plan_store, AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn mode_name(state: &AppState) -> Option<&'static str> {
    plan_store(state.db.as_ref(), state.backend.as_ref()).map(|s| s.mode().as_str())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "mode": mode_name(state),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e,
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "mode": mode_name(state),
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_backend_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let url = match required_str(req, "url") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let anon_key = match required_str(req, "anonKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let config = match BackendConfig::new(&url, &anon_key) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if let Err(e) = state.install_backend(config) {
        return err(&req.id, "backend_init_failed", format!("{e:?}"), None);
    }
    ok(
        &req.id,
        json!({
            "mode": mode_name(state),
            "authenticated": state.session.is_authenticated(),
        }),
    )
}

fn handle_backend_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.remove_backend();
    ok(&req.id, json!({ "mode": mode_name(state) }))
}

fn handle_backend_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "configured": state.backend.is_some(),
            "url": state.backend.as_ref().map(|b| b.config().url.clone()),
            "mode": mode_name(state),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "backend.configure" => Some(handle_backend_configure(state, req)),
        "backend.clear" => Some(handle_backend_clear(state, req)),
        "backend.status" => Some(handle_backend_status(state, req)),
        _ => None,
    }
}

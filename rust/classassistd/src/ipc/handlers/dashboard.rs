use super::{no_store, required_str};
use crate::ipc::error::ok;
use crate::ipc::types::{plan_store, AppState, Request};
use crate::list_state::PlanListState;
use crate::store::PlanStore;
use serde_json::{json, Value as JsonValue};

fn snapshot(mode: &str, dashboard: &PlanListState) -> JsonValue {
    let latest = dashboard.latest();
    json!({
        "mode": mode,
        "loading": dashboard.is_loading(),
        "error": dashboard.error(),
        "deletingId": dashboard.deleting(),
        "total": dashboard.total(),
        "latestSubject": latest.map(|p| p.subject.clone()),
        "latestCreatedAt": latest.map(|p| p.created_at.clone()),
        "plans": dashboard.plans(),
    })
}

fn load(store: &dyn PlanStore, dashboard: &mut PlanListState) {
    let ticket = dashboard.begin_load();
    let result = store.list().map_err(|e| e.to_string());
    let outcome = dashboard.finish_load(ticket, result);
    tracing::debug!(?outcome, total = dashboard.total(), "dashboard load finished");
}

fn handle_open(state: &mut AppState, req: &Request) -> JsonValue {
    state.close_dashboard();
    let AppState {
        db,
        backend,
        dashboard,
        ..
    } = state;
    let Some(store) = plan_store(db.as_ref(), backend.as_ref()) else {
        return no_store(req);
    };
    let view = dashboard.insert(PlanListState::new());
    load(&*store, view);
    ok(&req.id, snapshot(store.mode().as_str(), view))
}

fn handle_load(state: &mut AppState, req: &Request) -> JsonValue {
    let AppState {
        db,
        backend,
        dashboard,
        ..
    } = state;
    let Some(store) = plan_store(db.as_ref(), backend.as_ref()) else {
        return no_store(req);
    };
    let view = dashboard.get_or_insert_with(PlanListState::new);
    load(&*store, view);
    ok(&req.id, snapshot(store.mode().as_str(), view))
}

fn handle_delete_one(state: &mut AppState, req: &Request) -> JsonValue {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let AppState {
        db,
        backend,
        dashboard,
        ..
    } = state;
    let Some(store) = plan_store(db.as_ref(), backend.as_ref()) else {
        return no_store(req);
    };
    let view = dashboard.get_or_insert_with(PlanListState::new);
    view.begin_delete(&id);
    let result = store.delete_by_id(&id).map_err(|e| e.to_string());
    view.finish_delete(&id, result);
    ok(&req.id, snapshot(store.mode().as_str(), view))
}

fn handle_clear_all(state: &mut AppState, req: &Request) -> JsonValue {
    let AppState {
        db,
        backend,
        dashboard,
        ..
    } = state;
    let Some(store) = plan_store(db.as_ref(), backend.as_ref()) else {
        return no_store(req);
    };
    let view = dashboard.get_or_insert_with(PlanListState::new);
    match store.delete_all() {
        Ok(()) => load(&*store, view),
        Err(e) => view.fail(e.to_string()),
    }
    ok(&req.id, snapshot(store.mode().as_str(), view))
}

fn handle_close(state: &mut AppState, req: &Request) -> JsonValue {
    let was_open = state.dashboard.is_some();
    state.close_dashboard();
    ok(&req.id, json!({ "closed": was_open }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<JsonValue> {
    match req.method.as_str() {
        "dashboard.open" => Some(handle_open(state, req)),
        "dashboard.load" => Some(handle_load(state, req)),
        "dashboard.deleteOne" => Some(handle_delete_one(state, req)),
        "dashboard.clearAll" => Some(handle_clear_all(state, req)),
        "dashboard.close" => Some(handle_close(state, req)),
        _ => None,
    }
}

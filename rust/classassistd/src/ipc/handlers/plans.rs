use super::{no_store, opt_str, required_str};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{plan_store, AppState, Request};
use crate::model::{self, NewLessonPlan, Suggestions};
use crate::views::{self, PlanView};
use serde_json::{json, Value as JsonValue};

fn parse_duration(v: Option<&JsonValue>) -> Result<i64, &'static str> {
    match v {
        None => Ok(model::DEFAULT_DURATION_MINUTES),
        Some(v) if v.is_null() => Ok(model::DEFAULT_DURATION_MINUTES),
        Some(v) => v.as_i64().ok_or("duration must be an integer"),
    }
}

fn parse_suggestions(v: Option<&JsonValue>) -> Result<Option<Suggestions>, String> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| format!("suggestions: {e}")),
    }
}

fn parse_new_plan(req: &Request) -> Result<NewLessonPlan, JsonValue> {
    let bad = |msg: String| err(&req.id, "bad_params", msg, None);
    let duration = parse_duration(req.params.get("duration")).map_err(|m| bad(m.to_string()))?;
    let mut suggestions = parse_suggestions(req.params.get("suggestions")).map_err(bad)?;

    let subject = opt_str(req, "subject").unwrap_or_default().to_string();
    let grade = opt_str(req, "grade").unwrap_or_default().to_string();
    let generate = req
        .params
        .get("generateSuggestions")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if suggestions.is_none() && generate {
        suggestions = Some(model::suggestions_template(&subject, &grade, duration));
    }

    NewLessonPlan {
        subject,
        grade,
        duration,
        goals: opt_str(req, "goals").unwrap_or_default().to_string(),
        suggestions,
    }
    .normalized()
    .map_err(|m| err(&req.id, "bad_params", m, None))
}

fn handle_plans_list(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    match store.list() {
        Ok(plans) => ok(&req.id, json!({ "mode": store.mode().as_str(), "plans": plans })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_plans_get(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    let id = opt_str(req, "id").unwrap_or_default();
    match store.get_by_id(id) {
        Ok(plan) => ok(&req.id, json!({ "found": plan.is_some(), "plan": plan })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_plans_create(state: &mut AppState, req: &Request) -> JsonValue {
    let plan = match parse_new_plan(req) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    let in_hint_range = model::duration_in_hint_range(plan.duration);
    match store.insert(plan) {
        Ok(created) => {
            tracing::info!(id = %created.id, mode = store.mode().as_str(), "lesson plan saved");
            ok(
                &req.id,
                json!({
                    "planId": created.id,
                    "plan": created,
                    "durationInHintRange": in_hint_range,
                }),
            )
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_plans_delete(state: &mut AppState, req: &Request) -> JsonValue {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    match store.delete_by_id(&id) {
        Ok(()) => ok(&req.id, json!({ "deletedId": id })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_plans_delete_all(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    match store.delete_all() {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_form_defaults(_state: &mut AppState, req: &Request) -> JsonValue {
    ok(
        &req.id,
        json!({
            "duration": model::DEFAULT_DURATION_MINUTES,
            "durationMin": model::DURATION_HINT_MIN,
            "durationMax": model::DURATION_HINT_MAX,
        }),
    )
}

fn handle_generate_structure(_state: &mut AppState, req: &Request) -> JsonValue {
    let subject = opt_str(req, "subject").unwrap_or_default();
    ok(&req.id, json!({ "goals": model::structure_template(subject) }))
}

fn handle_generate_suggestions(_state: &mut AppState, req: &Request) -> JsonValue {
    let duration = match parse_duration(req.params.get("duration")) {
        Ok(d) => d,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let suggestions = model::suggestions_template(
        opt_str(req, "subject").unwrap_or_default(),
        opt_str(req, "grade").unwrap_or_default(),
        duration,
    );
    ok(&req.id, json!({ "suggestions": suggestions }))
}

fn handle_plan_view(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(store) = plan_store(state.db.as_ref(), state.backend.as_ref()) else {
        return no_store(req);
    };
    let view = PlanView::load(&*store, opt_str(req, "id"));
    let mut out = view.to_json();
    if let PlanView::Found(plan) = &view {
        out["detailsPath"] = json!(views::details_path(&plan.id));
        out["previewPath"] = json!(views::preview_path(&plan.id));
    }
    ok(&req.id, out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<JsonValue> {
    match req.method.as_str() {
        "plans.list" => Some(handle_plans_list(state, req)),
        "plans.get" => Some(handle_plans_get(state, req)),
        "plans.create" => Some(handle_plans_create(state, req)),
        "plans.delete" => Some(handle_plans_delete(state, req)),
        "plans.deleteAll" => Some(handle_plans_delete_all(state, req)),
        "plans.formDefaults" => Some(handle_form_defaults(state, req)),
        "plans.generateStructure" => Some(handle_generate_structure(state, req)),
        "plans.generateSuggestions" => Some(handle_generate_suggestions(state, req)),
        "plan.details" | "plan.preview" => Some(handle_plan_view(state, req)),
        _ => None,
    }
}

use super::opt_str;
use crate::auth::{AuthClient, SignUpOutcome};
use crate::ipc::error::{auth_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::AuthService;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

fn auth_client(state: &AppState, req: &Request) -> Result<Arc<AuthClient>, JsonValue> {
    state
        .backend
        .as_ref()
        .map(|b| Arc::clone(&b.auth))
        .ok_or_else(|| {
            err(
                &req.id,
                "backend_unconfigured",
                "sign-in needs a configured backend",
                None,
            )
        })
}

fn credentials(req: &Request) -> (&str, &str) {
    (
        opt_str(req, "email").unwrap_or_default(),
        opt_str(req, "password").unwrap_or_default(),
    )
}

fn status_json(state: &AppState, auth: Option<&AuthClient>) -> JsonValue {
    json!({
        "authenticated": state.session.is_authenticated(),
        "backendConfigured": state.backend.is_some(),
        "sessionTracked": state.session.is_attached(),
        "user": auth.and_then(|a| a.current_user()),
    })
}

fn handle_status(state: &mut AppState, req: &Request) -> JsonValue {
    let auth = state.backend.as_ref().map(|b| Arc::clone(&b.auth));
    if let Some(auth) = auth.as_deref() {
        // Lets the service refresh or expire the session; any change reaches
        // the tracker through its listener.
        if let Err(e) = auth.current_session() {
            tracing::warn!(error = %e, "session check failed");
        }
    }
    ok(&req.id, status_json(state, auth.as_deref()))
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> JsonValue {
    let auth = match auth_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let (email, password) = credentials(req);
    match auth.sign_in_with_password(email, password) {
        Ok(_) => ok(&req.id, status_json(state, Some(&*auth))),
        Err(e) => auth_err(&req.id, &e),
    }
}

fn handle_sign_up(state: &mut AppState, req: &Request) -> JsonValue {
    let auth = match auth_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let (email, password) = credentials(req);
    match auth.sign_up(email, password) {
        Ok(SignUpOutcome::SignedIn(_)) => {
            let mut out = status_json(state, Some(&*auth));
            out["outcome"] = json!("signedIn");
            ok(&req.id, out)
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            let mut out = status_json(state, Some(&*auth));
            out["outcome"] = json!("confirmationRequired");
            out["message"] =
                json!("Account created. Check your email to confirm, then come back and log in.");
            ok(&req.id, out)
        }
        Err(e) => auth_err(&req.id, &e),
    }
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> JsonValue {
    let auth = match auth_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if let Err(e) = state.session.sign_out(&*auth) {
        return auth_err(&req.id, &e);
    }
    ok(&req.id, status_json(state, Some(&*auth)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<JsonValue> {
    match req.method.as_str() {
        "auth.status" => Some(handle_status(state, req)),
        "auth.signIn" => Some(handle_sign_in(state, req)),
        "auth.signUp" => Some(handle_sign_up(state, req)),
        "auth.signOut" => Some(handle_sign_out(state, req)),
        _ => None,
    }
}

//! In-process stand-in for the hosted backend: a `lesson_plans` REST table
//! and the password/refresh/signup/logout identity endpoints.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::ANON_KEY;

pub const EMAIL: &str = "teacher@example.com";
pub const PASSWORD: &str = "correct horse";

#[derive(Default)]
pub struct FakeState {
    rows: Vec<Value>,
    next_row: u32,
    next_token: u32,
    live_tokens: HashSet<String>,
    delete_filters: Vec<String>,
    logout_calls: u32,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    pub url: String,
    state: Shared,
}

impl FakeBackend {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fake backend");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("fake backend addr");
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let app = router(Arc::clone(&state));

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("fake backend runtime");
            rt.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("serve fake backend");
            });
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn delete_filters(&self) -> Vec<String> {
        self.state.lock().expect("lock").delete_filters.clone()
    }

    pub fn logout_calls(&self) -> u32 {
        self.state.lock().expect("lock").logout_calls
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().expect("lock").rows.len()
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route(
            "/rest/v1/lesson_plans",
            get(select_rows).post(insert_row).delete(delete_rows),
        )
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(logout))
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

fn failure(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn missing_key() -> Response {
    failure(
        StatusCode::UNAUTHORIZED,
        json!({ "message": "No API key found in request" }),
    )
}

async fn select_rows(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_api_key(&headers) {
        return missing_key();
    }
    let state = state.lock().expect("lock");
    let rows: Vec<Value> = match q.get("id").and_then(|f| f.strip_prefix("eq.")) {
        Some(id) => state
            .rows
            .iter()
            .filter(|r| r["id"] == json!(id))
            .take(1)
            .cloned()
            .collect(),
        None => state.rows.clone(),
    };
    // Rows are kept newest first, which is the only order the client asks for.
    Json(Value::Array(rows)).into_response()
}

async fn insert_row(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_api_key(&headers) {
        return missing_key();
    }
    let mut state = state.lock().expect("lock");
    let signed_in = bearer(&headers).is_some_and(|t| state.live_tokens.contains(t));
    if !signed_in {
        return failure(
            StatusCode::UNAUTHORIZED,
            json!({
                "code": "42501",
                "message": "new row violates row-level security policy for table \"lesson_plans\""
            }),
        );
    }

    state.next_row += 1;
    let n = state.next_row;
    let mut row = body;
    row["id"] = json!(format!("plan-{n}"));
    row["created_at"] = json!(format!("2026-10-19T10:{n:02}:00+00:00"));
    if row.get("suggestions").is_none() {
        row["suggestions"] = Value::Null;
    }
    state.rows.insert(0, row.clone());

    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok());
    if prefer == Some("return=representation") {
        (StatusCode::CREATED, Json(json!([row]))).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn delete_rows(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_api_key(&headers) {
        return missing_key();
    }
    let Some(filter) = q.get("id").cloned() else {
        return failure(
            StatusCode::BAD_REQUEST,
            json!({ "code": "21000", "message": "DELETE requires a WHERE clause" }),
        );
    };
    let mut state = state.lock().expect("lock");
    if let Some(id) = filter.strip_prefix("eq.") {
        let id = json!(id);
        state.rows.retain(|r| r["id"] != id);
    } else if let Some(id) = filter.strip_prefix("neq.") {
        let id = json!(id);
        state.rows.retain(|r| r["id"] == id);
    }
    state.delete_filters.push(filter);
    StatusCode::NO_CONTENT.into_response()
}

fn issue_token(state: &mut FakeState, user_id: &str, email: &str) -> Value {
    state.next_token += 1;
    let access = format!("access-{}", state.next_token);
    state.live_tokens.insert(access.clone());
    json!({
        "access_token": access,
        "refresh_token": format!("refresh-{}", state.next_token),
        "token_type": "bearer",
        "expires_in": 3600,
        "user": { "id": user_id, "email": email, "role": "authenticated" }
    })
}

async fn token(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("lock");
    match q.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            if email != EMAIL || password != PASSWORD {
                return failure(
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid login credentials"
                    }),
                );
            }
            Json(issue_token(&mut state, "user-1", EMAIL)).into_response()
        }
        Some("refresh_token") => {
            let valid = body["refresh_token"]
                .as_str()
                .is_some_and(|t| t.starts_with("refresh-"));
            if !valid {
                return failure(
                    StatusCode::BAD_REQUEST,
                    json!({ "error_description": "Invalid Refresh Token" }),
                );
            }
            Json(issue_token(&mut state, "user-1", EMAIL)).into_response()
        }
        _ => failure(
            StatusCode::BAD_REQUEST,
            json!({ "msg": "unsupported_grant_type" }),
        ),
    }
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email == EMAIL {
        return failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "msg": "User already registered" }),
        );
    }
    // Addresses under this prefix mimic a project with e-mail confirmation on.
    if email.starts_with("confirm") {
        return Json(json!({
            "id": "user-2",
            "email": email,
            "confirmation_sent_at": "2026-10-19T10:00:00Z"
        }))
        .into_response();
    }
    let mut state = state.lock().expect("lock");
    Json(issue_token(&mut state, "user-3", &email)).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().expect("lock");
    state.logout_calls += 1;
    if let Some(token) = bearer(&headers).map(str::to_string) {
        state.live_tokens.remove(&token);
    }
    StatusCode::NO_CONTENT.into_response()
}

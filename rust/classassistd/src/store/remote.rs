use super::{PlanStore, StoreError, StoreMode};
use crate::auth::{AuthClient, AuthError};
use crate::http;
use crate::model::{LessonPlan, NewLessonPlan};
use reqwest::blocking::{Client, RequestBuilder};
use std::sync::Arc;

pub const TABLE: &str = "lesson_plans";
const SELECT_COLUMNS: &str = "id,subject,grade,duration,goals,suggestions,created_at";

/// The REST layer refuses a DELETE without a filter, so delete-all filters on
/// an id that can never exist.
pub const DELETE_ALL_SENTINEL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Lesson plans in the hosted backend, through its PostgREST endpoint.
pub struct RemotePlanStore {
    http: Client,
    auth: Arc<AuthClient>,
}

impl RemotePlanStore {
    pub fn new(http: Client, auth: Arc<AuthClient>) -> Self {
        Self { http, auth }
    }

    fn table_url(&self) -> String {
        self.auth.config().rest_url(TABLE)
    }

    /// Signed-in requests carry the session token, refreshed when expired.
    /// Signed-out requests carry the anon key.
    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let anon_key = &self.auth.config().anon_key;
        let bearer = match self.auth.access_token() {
            Ok(token) => token.unwrap_or_else(|| anon_key.clone()),
            Err(AuthError::Transport(e)) => return Err(StoreError::Transport(e)),
            Err(e) => return Err(StoreError::Decode(e.to_string())),
        };
        Ok(req.header("apikey", anon_key).bearer_auth(bearer))
    }

    fn send(&self, op: &'static str, req: RequestBuilder) -> Result<String, StoreError> {
        let resp = self
            .authorized(req)?
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let (status, body) =
            http::read_response(resp).map_err(|e| StoreError::Transport(e.to_string()))?;
        tracing::debug!(op, status = status.as_u16(), "lesson_plans round-trip");
        if !status.is_success() {
            return Err(StoreError::Service {
                status: status.as_u16(),
                message: http::error_message(status, &body),
            });
        }
        Ok(body)
    }
}

pub(crate) fn list_query() -> Vec<(&'static str, String)> {
    vec![
        ("select", SELECT_COLUMNS.to_string()),
        ("order", "created_at.desc".to_string()),
    ]
}

pub(crate) fn by_id_query(id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", SELECT_COLUMNS.to_string()),
        ("id", format!("eq.{id}")),
        ("limit", "1".to_string()),
    ]
}

pub(crate) fn decode_rows(body: &str) -> Result<Vec<LessonPlan>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))
}

impl PlanStore for RemotePlanStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Backend
    }

    fn list(&self) -> Result<Vec<LessonPlan>, StoreError> {
        let body = self.send("list", self.http.get(self.table_url()).query(&list_query()))?;
        decode_rows(&body)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<LessonPlan>, StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let body = self.send(
            "get",
            self.http.get(self.table_url()).query(&by_id_query(id)),
        )?;
        Ok(decode_rows(&body)?.into_iter().next())
    }

    fn insert(&self, plan: NewLessonPlan) -> Result<LessonPlan, StoreError> {
        let req = self
            .http
            .post(self.table_url())
            .query(&[("select", SELECT_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(&plan);
        let body = self.send("insert", req)?;
        decode_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let req = self
            .http
            .delete(self.table_url())
            .query(&[("id", format!("eq.{id}"))]);
        self.send("delete", req).map(|_| ())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        let req = self
            .http
            .delete(self.table_url())
            .query(&[("id", format!("neq.{DELETE_ALL_SENTINEL_ID}"))]);
        self.send("delete_all", req).map(|_| ())
    }
}

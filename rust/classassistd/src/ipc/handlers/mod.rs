pub mod auth;
pub mod core;
pub mod dashboard;
pub mod plans;

use crate::ipc::error::err;
use crate::ipc::types::Request;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{}", key), None))
}

fn opt_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

fn no_store(req: &Request) -> serde_json::Value {
    err(
        &req.id,
        "no_workspace",
        "select a workspace or configure a backend first",
        None,
    )
}

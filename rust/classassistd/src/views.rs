use crate::model::LessonPlan;
use crate::store::PlanStore;
use serde_json::{json, Value};

/// What the detail and preview pages render for an `id` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanView {
    /// The route carried no usable `id`.
    MissingId,
    NotFound,
    Found(LessonPlan),
    Failed(String),
}

impl PlanView {
    pub fn load(store: &dyn PlanStore, id: Option<&str>) -> Self {
        let Some(id) = id.map(str::trim).filter(|s| !s.is_empty()) else {
            return PlanView::MissingId;
        };
        match store.get_by_id(id) {
            Ok(Some(plan)) => PlanView::Found(plan),
            Ok(None) => PlanView::NotFound,
            Err(e) => PlanView::Failed(e.to_string()),
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            PlanView::MissingId => "missingId",
            PlanView::NotFound => "notFound",
            PlanView::Found(_) => "found",
            PlanView::Failed(_) => "error",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PlanView::Found(plan) => json!({ "state": self.state_name(), "plan": plan }),
            PlanView::Failed(message) => json!({ "state": self.state_name(), "message": message }),
            _ => json!({ "state": self.state_name() }),
        }
    }
}

/// Shareable route for a plan's detail page.
pub fn details_path(id: &str) -> String {
    format!("/plan/details?id={id}")
}

pub fn preview_path(id: &str) -> String {
    format!("/plan/preview?id={id}")
}

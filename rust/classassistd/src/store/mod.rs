//! Lesson-plan persistence.
//!
//! Two interchangeable stores implement [`PlanStore`]: [`RemotePlanStore`]
//! talks to the hosted backend's REST API, [`LocalPlanStore`] keeps the whole
//! collection under a single key of the workspace database. Views are written
//! against the trait and never know which one is active.

mod local;
mod remote;

pub use local::LocalPlanStore;
pub use remote::RemotePlanStore;

use crate::model::{LessonPlan, NewLessonPlan};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The service answered but the body was not the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Local persistence could not be written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Transport(_) => "store_unreachable",
            StoreError::Service { .. } => "store_failed",
            StoreError::Decode(_) => "store_bad_response",
            StoreError::Storage(_) => "storage_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Backend,
    Local,
}

impl StoreMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreMode::Backend => "backend",
            StoreMode::Local => "local",
        }
    }
}

pub trait PlanStore {
    fn mode(&self) -> StoreMode;

    /// Every plan, newest first. An error means "no data", never a partial list.
    fn list(&self) -> Result<Vec<LessonPlan>, StoreError>;

    /// `Ok(None)` is not-found. A blank id is not-found without any I/O.
    fn get_by_id(&self, id: &str) -> Result<Option<LessonPlan>, StoreError>;

    fn insert(&self, plan: NewLessonPlan) -> Result<LessonPlan, StoreError>;

    /// Deleting an id that does not exist succeeds.
    fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;

    fn delete_all(&self) -> Result<(), StoreError>;
}

impl<T: PlanStore + ?Sized> PlanStore for &T {
    fn mode(&self) -> StoreMode {
        (**self).mode()
    }

    fn list(&self) -> Result<Vec<LessonPlan>, StoreError> {
        (**self).list()
    }

    fn get_by_id(&self, id: &str) -> Result<Option<LessonPlan>, StoreError> {
        (**self).get_by_id(id)
    }

    fn insert(&self, plan: NewLessonPlan) -> Result<LessonPlan, StoreError> {
        (**self).insert(plan)
    }

    fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete_by_id(id)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        (**self).delete_all()
    }
}

//! Render-local copy of the plan collection held by the dashboard.
//!
//! Loads are versioned: each one takes a ticket, and a result is applied only
//! when no newer load and no local mutation happened after that ticket was
//! issued. This keeps an old load from resurrecting a row that was deleted
//! while it was in flight.

use crate::model::LessonPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued; its result will land instead.
    Superseded,
    /// The list was mutated locally after this load started.
    Invalidated,
    /// The owning view is gone.
    Disposed,
}

#[derive(Debug, Default)]
pub struct PlanListState {
    plans: Vec<LessonPlan>,
    error: Option<String>,
    loading: bool,
    deleting: Option<String>,
    generation: u64,
    latest_load: u64,
    disposed: bool,
}

impl PlanListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.latest_load = self.generation;
        self.loading = true;
        self.error = None;
        LoadTicket(self.generation)
    }

    /// A failed load shows the error and no rows, never a partial list.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<LessonPlan>, String>,
    ) -> LoadOutcome {
        if self.disposed {
            return LoadOutcome::Disposed;
        }
        if ticket.0 != self.latest_load {
            tracing::debug!(ticket = ticket.0, latest = self.latest_load, "superseded load dropped");
            return LoadOutcome::Superseded;
        }
        self.loading = false;
        if ticket.0 != self.generation {
            tracing::debug!(ticket = ticket.0, generation = self.generation, "load predates a local mutation");
            return LoadOutcome::Invalidated;
        }
        match result {
            Ok(plans) => {
                self.plans = plans;
                self.error = None;
            }
            Err(message) => {
                self.plans.clear();
                self.error = Some(message);
            }
        }
        LoadOutcome::Applied
    }

    pub fn begin_delete(&mut self, id: &str) {
        if self.disposed {
            return;
        }
        self.deleting = Some(id.to_string());
        self.error = None;
    }

    /// On success the row is removed locally without a reload.
    pub fn finish_delete(&mut self, id: &str, result: Result<(), String>) -> bool {
        if self.disposed {
            return false;
        }
        if self.deleting.as_deref() == Some(id) {
            self.deleting = None;
        }
        match result {
            Ok(()) => {
                self.plans.retain(|p| p.id != id);
                self.generation += 1;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    /// Records a failure of an operation that is not a load or single delete.
    pub fn fail(&mut self, message: String) {
        if self.disposed {
            return;
        }
        self.loading = false;
        self.error = Some(message);
    }

    /// Late results after this are ignored.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn plans(&self) -> &[LessonPlan] {
        &self.plans
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn deleting(&self) -> Option<&str> {
        self.deleting.as_deref()
    }

    pub fn total(&self) -> usize {
        self.plans.len()
    }

    /// The newest plan; lists are kept newest first.
    pub fn latest(&self) -> Option<&LessonPlan> {
        self.plans.first()
    }
}

use super::{PlanStore, StoreError, StoreMode};
use crate::db;
use crate::model::{LessonPlan, NewLessonPlan};
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use uuid::Uuid;

pub const LOCAL_PLANS_KEY: &str = "classassist.lessonPlans";

/// Plans kept as one JSON array under [`LOCAL_PLANS_KEY`], newest first.
pub struct LocalPlanStore<'a> {
    conn: &'a Connection,
}

impl<'a> LocalPlanStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // Unreadable or corrupt storage reads as an empty collection.
    fn load(&self) -> Vec<LessonPlan> {
        let raw = match db::settings_get_raw(self.conn, LOCAL_PLANS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "local plan storage unreadable");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<LessonPlan>>(&raw) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt local plan data");
                Vec::new()
            }
        }
    }

    fn save(&self, plans: &[LessonPlan]) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(plans).map_err(|e| StoreError::Storage(e.to_string()))?;
        db::settings_set_json(self.conn, LOCAL_PLANS_KEY, &value)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl PlanStore for LocalPlanStore<'_> {
    fn mode(&self) -> StoreMode {
        StoreMode::Local
    }

    fn list(&self) -> Result<Vec<LessonPlan>, StoreError> {
        Ok(self.load())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<LessonPlan>, StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(self.load().into_iter().find(|p| p.id == id))
    }

    fn insert(&self, plan: NewLessonPlan) -> Result<LessonPlan, StoreError> {
        let created = LessonPlan {
            id: Uuid::new_v4().to_string(),
            subject: plan.subject,
            grade: plan.grade,
            duration: plan.duration,
            goals: plan.goals,
            suggestions: plan.suggestions,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        let mut plans = self.load();
        plans.insert(0, created.clone());
        self.save(&plans)?;
        tracing::debug!(id = %created.id, total = plans.len(), "local plan inserted");
        Ok(created)
    }

    fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let mut plans = self.load();
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() == before {
            return Ok(());
        }
        self.save(&plans)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        db::settings_delete(self.conn, LOCAL_PLANS_KEY)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open memory db");
        db::init_schema(&conn).expect("schema");
        conn
    }

    fn new_plan(subject: &str) -> NewLessonPlan {
        NewLessonPlan {
            subject: subject.to_string(),
            grade: "5th".to_string(),
            duration: 45,
            goals: "Intro to fractions".to_string(),
            suggestions: None,
        }
    }

    #[test]
    fn insert_list_get_delete_scenario() {
        let conn = memory_db();
        let store = LocalPlanStore::new(&conn);

        let created = store.insert(new_plan("Math")).expect("insert");
        assert!(!created.id.is_empty());
        assert!(!created.created_at.is_empty());

        let plans = store.list().expect("list");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].subject, "Math");
        assert_eq!(plans[0].grade, "5th");
        assert_eq!(plans[0].duration, 45);
        assert_eq!(plans[0].goals, "Intro to fractions");

        assert_eq!(
            store.get_by_id(&created.id).expect("get"),
            Some(created.clone())
        );

        store.delete_by_id(&created.id).expect("delete");
        assert!(store.list().expect("list").is_empty());
        assert_eq!(store.get_by_id(&created.id).expect("get"), None);
        store.delete_by_id(&created.id).expect("second delete is not an error");
    }

    #[test]
    fn newest_insert_lists_first() {
        let conn = memory_db();
        let store = LocalPlanStore::new(&conn);
        let a = store.insert(new_plan("A")).expect("insert a");
        let b = store.insert(new_plan("B")).expect("insert b");
        let ids: Vec<String> = store.list().expect("list").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn delete_all_empties_any_collection() {
        let conn = memory_db();
        let store = LocalPlanStore::new(&conn);
        store.delete_all().expect("delete all on empty");
        for s in ["A", "B", "C"] {
            store.insert(new_plan(s)).expect("insert");
        }
        store.delete_all().expect("delete all");
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn corrupt_storage_reads_as_empty() {
        let conn = memory_db();
        let store = LocalPlanStore::new(&conn);
        store.insert(new_plan("Math")).expect("insert");

        conn.execute(
            "UPDATE settings SET value_json = ? WHERE key = ?",
            ("{not json", LOCAL_PLANS_KEY),
        )
        .expect("corrupt");
        assert!(store.list().expect("list").is_empty());

        // Well-formed JSON of the wrong shape is just as unusable.
        conn.execute(
            "UPDATE settings SET value_json = ? WHERE key = ?",
            ("{\"plans\":1}", LOCAL_PLANS_KEY),
        )
        .expect("corrupt");
        assert!(store.list().expect("list").is_empty());

        // The next insert starts a fresh collection.
        store.insert(new_plan("History")).expect("insert");
        assert_eq!(store.list().expect("list").len(), 1);
    }

    #[test]
    fn missing_table_reads_as_empty() {
        let conn = Connection::open_in_memory().expect("open memory db");
        let store = LocalPlanStore::new(&conn);
        assert!(store.list().expect("list").is_empty());
        assert!(matches!(
            store.insert(new_plan("Math")),
            Err(StoreError::Storage(_))
        ));
    }

    #[test]
    fn blank_id_is_not_found() {
        let conn = memory_db();
        let store = LocalPlanStore::new(&conn);
        store.insert(new_plan("Math")).expect("insert");
        assert_eq!(store.get_by_id("  ").expect("get"), None);
    }
}

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_DURATION_MINUTES: i64 = 45;
/// Input hint for the duration field. Stores never enforce it.
pub const DURATION_HINT_MIN: i64 = 10;
pub const DURATION_HINT_MAX: i64 = 180;

/// A stored lesson plan.
///
/// The hosted backend spells the timestamp `created_at`; the local store and
/// the IPC surface use `createdAt`. Both decode into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub id: String,
    pub subject: String,
    pub grade: String,
    pub duration: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub goals: String,
    #[serde(default)]
    pub suggestions: Option<Suggestions>,
    #[serde(alias = "created_at")]
    pub created_at: String,
}

// The hosted column is nullable.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub differentiation: Vec<String>,
    #[serde(default)]
    pub assessment: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
}

/// Caller-supplied fields for a new plan. Ids and timestamps are assigned by
/// whichever store persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLessonPlan {
    pub subject: String,
    pub grade: String,
    pub duration: i64,
    pub goals: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggestions: Option<Suggestions>,
}

impl NewLessonPlan {
    /// Trims text fields and checks the ones the creation form requires.
    pub fn normalized(mut self) -> Result<Self, &'static str> {
        self.subject = self.subject.trim().to_string();
        self.grade = self.grade.trim().to_string();
        self.goals = self.goals.trim().to_string();
        if self.subject.is_empty() {
            return Err("subject must not be empty");
        }
        if self.grade.is_empty() {
            return Err("grade must not be empty");
        }
        if self.goals.is_empty() {
            return Err("goals must not be empty");
        }
        Ok(self)
    }
}

pub fn duration_in_hint_range(duration: i64) -> bool {
    (DURATION_HINT_MIN..=DURATION_HINT_MAX).contains(&duration)
}

/// Multi-section goals text offered by "generate full lesson structure".
pub fn structure_template(subject: &str) -> String {
    let topic = match subject.trim() {
        "" => "the topic",
        s => s,
    };
    format!(
        "Learning Goals:\n\
         1. Understand key ideas in {topic}\n\
         2. Develop critical thinking skills\n\
         3. Apply knowledge through activity\n\
         \n\
         Activities:\n\
         \u{2022} Warm-up: Short discussion or question\n\
         \u{2022} Main Activity: Hands-on task or group work\n\
         \u{2022} Closing: Reflection or summary\n\
         \n\
         Assessment:\n\
         \u{2022} Quick check for understanding or short task"
    )
}

/// Static suggestion payload. Timings split the lesson roughly 15/60/25.
pub fn suggestions_template(subject: &str, grade: &str, duration: i64) -> Suggestions {
    let subject = match subject.trim() {
        "" => "the topic",
        s => s,
    };
    let grade = grade.trim();
    let duration = duration.max(1);
    let warm_up = (duration * 15 / 100).max(1);
    let closing = (duration * 25 / 100).max(1);
    let main = (duration - warm_up - closing).max(1);

    let audience = if grade.is_empty() {
        String::new()
    } else {
        format!(" for {grade}")
    };

    Suggestions {
        overview: format!("A {duration}-minute {subject} lesson{audience}."),
        steps: vec![
            format!("Warm-up ({warm_up} min): open with a short question about {subject}"),
            format!("Main activity ({main} min): hands-on task or group work"),
            format!("Closing ({closing} min): reflection or summary"),
        ],
        differentiation: vec![
            "Offer worked examples for students who need support".to_string(),
            "Provide an extension question for early finishers".to_string(),
        ],
        assessment: vec![
            "Exit ticket with one check-for-understanding question".to_string(),
            "Observe group work against the learning goals".to_string(),
        ],
        materials: vec![
            "Whiteboard and markers".to_string(),
            format!("Handout or worksheet for {subject}"),
        ],
    }
}

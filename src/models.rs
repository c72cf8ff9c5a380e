use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One observed assessment result. `category` keeps the raw tag so that
/// unrecognized tags survive ingestion and are dropped only when averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type", alias = "category")]
    pub category: String,
    #[serde(rename = "score", alias = "value", deserialize_with = "score_or_nan")]
    pub value: f64,
}

// JSON has no NaN or infinity; serde_json writes them as null.
fn score_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Rejects NaN and infinite scores at the write paths, where they would be
/// stored as null.
pub fn finite_score(value: f64) -> anyhow::Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        anyhow::bail!("score {value} is not a finite number")
    }
}

impl ScoreEntry {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
        }
    }
}

/// Grade document as it comes out of the store. Older documents carry flat
/// `exam`/`quiz`/`homework` arrays and a `student_id` key instead of a
/// tagged `scores` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeDocument {
    #[serde(alias = "student_id")]
    pub learner_id: Option<i64>,
    pub class_id: Option<i64>,
    pub scores: Vec<ScoreEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exam: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quiz: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub homework: Vec<f64>,
}

impl GradeDocument {
    /// Scores in the tagged shape, with any flat arrays folded in after the
    /// tagged entries.
    pub fn normalized_scores(&self) -> Vec<ScoreEntry> {
        let flat = [
            ("exam", &self.exam),
            ("quiz", &self.quiz),
            ("homework", &self.homework),
        ];

        let mut scores = self.scores.clone();
        for (category, values) in flat {
            scores.extend(values.iter().map(|value| ScoreEntry::new(category, *value)));
        }
        scores
    }

    /// Returns `None` when either identifier is missing or negative.
    pub fn into_record(self) -> Option<GradeRecord> {
        let learner_id = self.learner_id.filter(|id| *id >= 0)?;
        let class_id = self.class_id.filter(|id| *id >= 0)?;
        let scores = self.normalized_scores();

        Some(GradeRecord {
            learner_id,
            class_id,
            scores,
        })
    }
}

/// A well-formed grade document: both identifiers present and non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub learner_id: i64,
    pub class_id: i64,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredGrade {
    pub id: Uuid,
    pub source_key: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub document: GradeDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedAverageResult {
    pub learner_id: i64,
    pub class_id: i64,
    pub weighted_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerAverage {
    pub learner_id: i64,
    pub weighted_average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub total_learners: usize,
    pub passing_learners: usize,
    pub passing_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub avg_score: f64,
}

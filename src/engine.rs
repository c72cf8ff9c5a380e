use crate::aggregate::{group_by_learner, group_by_learner_class};
use crate::grading::{weighted_average, CategoryWeights};
use crate::models::{
    ClassStatistics, GradeDocument, GradeRecord, LearnerAverage, WeightedAverageResult,
};
use crate::stats::compute_class_statistics;

/// Snapshot of well-formed grade records fetched for a single request.
#[derive(Debug, Clone, Default)]
pub struct Gradebook {
    records: Vec<GradeRecord>,
}

impl Gradebook {
    /// Keeps documents with usable identifiers and drops the rest.
    pub fn ingest<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = GradeDocument>,
    {
        let mut skipped = 0usize;
        let records: Vec<GradeRecord> = documents
            .into_iter()
            .filter_map(|document| {
                let record = document.into_record();
                if record.is_none() {
                    skipped += 1;
                }
                record
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(
                skipped,
                kept = records.len(),
                "dropped grade documents without ids"
            );
        }

        Self { records }
    }

    pub fn records(&self) -> &[GradeRecord] {
        &self.records
    }

    /// One row per class the learner has records in, in first-seen order.
    pub fn student_class_averages(
        &self,
        learner_id: i64,
        weights: &CategoryWeights,
    ) -> Vec<WeightedAverageResult> {
        group_by_learner_class(&self.records)
            .into_iter()
            .filter(|group| group.key.0 == learner_id)
            .map(|group| WeightedAverageResult {
                learner_id: group.key.0,
                class_id: group.key.1,
                weighted_average: weighted_average(group.entries, weights),
            })
            .collect()
    }

    /// Cross-class weighted average for every learner in the snapshot.
    pub fn learner_averages(&self, weights: &CategoryWeights) -> Vec<LearnerAverage> {
        group_by_learner(&self.records)
            .into_iter()
            .map(|group| LearnerAverage {
                learner_id: group.key,
                weighted_average: weighted_average(group.entries, weights),
            })
            .collect()
    }

    pub fn class_pass_rate(&self, threshold: f64, weights: &CategoryWeights) -> ClassStatistics {
        let averages: Vec<f64> = self
            .learner_averages(weights)
            .iter()
            .map(|learner| learner.weighted_average)
            .collect();

        compute_class_statistics(&averages, threshold)
    }

    /// Average for one learner/class pair; 0.0 when the pair has no records.
    pub fn weighted_average(
        &self,
        learner_id: i64,
        class_id: i64,
        weights: &CategoryWeights,
    ) -> f64 {
        let entries = self
            .records
            .iter()
            .filter(|record| record.learner_id == learner_id && record.class_id == class_id)
            .flat_map(|record| record.scores.iter());

        weighted_average(entries, weights)
    }
}

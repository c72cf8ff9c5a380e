use serde::Serialize;

use crate::category::{classify, ScoreCategory};
use crate::models::ScoreEntry;

/// Per-category coefficients. Callers are expected to supply weights that
/// sum to 1.0; nothing here enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryWeights {
    pub exam: f64,
    pub quiz: f64,
    pub homework: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            exam: 0.5,
            quiz: 0.3,
            homework: 0.2,
        }
    }
}

impl CategoryWeights {
    pub fn total(&self) -> f64 {
        self.exam + self.quiz + self.homework
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryAverages {
    pub exam: f64,
    pub quiz: f64,
    pub homework: f64,
}

impl CategoryAverages {
    pub fn combine(&self, weights: &CategoryWeights) -> f64 {
        weights.exam * self.exam + weights.quiz * self.quiz + weights.homework * self.homework
    }
}

#[derive(Default)]
struct Bucket {
    sum: f64,
    count: usize,
}

impl Bucket {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    // An empty bucket averages to 0.0 so the weighted sum stays defined.
    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

pub fn category_averages<'a, I>(entries: I) -> CategoryAverages
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    let mut exam = Bucket::default();
    let mut quiz = Bucket::default();
    let mut homework = Bucket::default();

    for entry in entries {
        match classify(entry) {
            ScoreCategory::Exam => exam.push(entry.value),
            ScoreCategory::Quiz => quiz.push(entry.value),
            ScoreCategory::Homework => homework.push(entry.value),
            ScoreCategory::Unrecognized => continue,
        }
    }

    CategoryAverages {
        exam: exam.mean(),
        quiz: quiz.mean(),
        homework: homework.mean(),
    }
}

/// Weighted combination of the exam, quiz and homework means. Non-finite
/// scores are not filtered and flow through into the result.
pub fn weighted_average<'a, I>(entries: I, weights: &CategoryWeights) -> f64
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    category_averages(entries).combine(weights)
}

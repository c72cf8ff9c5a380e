use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::engine::Gradebook;
use crate::grading::CategoryWeights;
use crate::models::CategorySummary;

pub fn summarize_by_category(book: &Gradebook) -> Vec<CategorySummary> {
    let mut map: HashMap<String, (usize, f64)> = HashMap::new();

    for entry in book.records().iter().flat_map(|record| record.scores.iter()) {
        let totals = map.entry(entry.category.clone()).or_insert((0, 0.0));
        totals.0 += 1;
        totals.1 += entry.value;
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total_score))| CategorySummary {
            category,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    summaries
}

pub fn build_report(
    class_id: Option<i64>,
    threshold: f64,
    generated_at: DateTime<Utc>,
    book: &Gradebook,
    weights: &CategoryWeights,
) -> String {
    let stats = book.class_pass_rate(threshold, weights);
    let summaries = summarize_by_category(book);
    let mut averages = book.learner_averages(weights);
    // Highest first; NaN averages sort after every number.
    averages.sort_by(|a, b| {
        a.weighted_average
            .is_nan()
            .cmp(&b.weighted_average.is_nan())
            .then_with(|| b.weighted_average.total_cmp(&a.weighted_average))
    });

    let mut output = String::new();
    let scope_label = match class_id {
        Some(id) => format!("class {id}"),
        None => "all classes".to_string(),
    };

    let _ = writeln!(output, "# Weighted Grades Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} (weights exam {:.2}, quiz {:.2}, homework {:.2})",
        scope_label,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        weights.exam,
        weights.quiz,
        weights.homework
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Pass Rate");

    if stats.total_learners == 0 {
        let _ = writeln!(output, "No learners with grades in this scope.");
    } else {
        let _ = writeln!(
            output,
            "- {} of {} learners above {:.2} ({:.1}%)",
            stats.passing_learners,
            stats.total_learners,
            threshold,
            stats.passing_percentage * 100.0
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No scores recorded in this scope.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} scores (avg {:.1})",
                summary.category, summary.count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Learners");

    if averages.is_empty() {
        let _ = writeln!(output, "No learners with grades in this scope.");
    } else {
        for learner in averages.iter().take(10) {
            let _ = writeln!(
                output,
                "- learner {}: weighted average {:.2}",
                learner.learner_id, learner.weighted_average
            );
        }
    }

    output
}

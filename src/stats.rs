use crate::models::ClassStatistics;

pub const DEFAULT_PASS_THRESHOLD: f64 = 0.7;

/// Counts averages strictly above `threshold`. An empty input reports a
/// percentage of 0 rather than dividing by zero.
pub fn compute_class_statistics(averages: &[f64], threshold: f64) -> ClassStatistics {
    let total_learners = averages.len();
    let passing_learners = averages
        .iter()
        .filter(|average| **average > threshold)
        .count();

    let passing_percentage = if total_learners == 0 {
        0.0
    } else {
        passing_learners as f64 / total_learners as f64
    };

    ClassStatistics {
        total_learners,
        passing_learners,
        passing_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn threshold_is_strict() {
        let stats = compute_class_statistics(&[0.71, 0.65, 0.80, 0.70], DEFAULT_PASS_THRESHOLD);
        assert_eq!(stats.total_learners, 4);
        assert_eq!(stats.passing_learners, 2);
        assert!((stats.passing_percentage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_input_reports_zero() {
        let stats = compute_class_statistics(&[], DEFAULT_PASS_THRESHOLD);
        assert_eq!(
            stats,
            ClassStatistics {
                total_learners: 0,
                passing_learners: 0,
                passing_percentage: 0.0,
            }
        );
    }

    #[test]
    fn nan_averages_never_pass() {
        let stats = compute_class_statistics(&[f64::NAN, 0.9], DEFAULT_PASS_THRESHOLD);
        assert_eq!(stats.total_learners, 2);
        assert_eq!(stats.passing_learners, 1);
    }

    #[test]
    fn custom_threshold_on_percent_scale() {
        let stats = compute_class_statistics(&[83.5, 70.0, 69.9], 70.0);
        assert_eq!(stats.passing_learners, 1);
    }

    proptest! {
        /// Property: passing plus failing always equals the total.
        #[test]
        fn counts_are_consistent(
            averages in prop::collection::vec(0.0f64..1.0, 0..50),
            threshold in 0.0f64..1.0,
        ) {
            let stats = compute_class_statistics(&averages, threshold);
            let failing = averages.iter().filter(|a| **a <= threshold).count();

            prop_assert_eq!(stats.total_learners, averages.len());
            prop_assert_eq!(stats.passing_learners + failing, stats.total_learners);
            if stats.total_learners == 0 {
                prop_assert_eq!(stats.passing_percentage, 0.0);
            } else {
                let expected = stats.passing_learners as f64 / stats.total_learners as f64;
                prop_assert_eq!(stats.passing_percentage, expected);
            }
        }
    }
}

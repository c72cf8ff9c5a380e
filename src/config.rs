use clap::Args;

use crate::grading::CategoryWeights;

#[derive(Args, Debug, Clone)]
pub struct WeightArgs {
    /// Weight applied to the exam average
    #[arg(long, global = true, env = "GRADES_EXAM_WEIGHT", default_value_t = 0.5)]
    pub exam_weight: f64,
    /// Weight applied to the quiz average
    #[arg(long, global = true, env = "GRADES_QUIZ_WEIGHT", default_value_t = 0.3)]
    pub quiz_weight: f64,
    /// Weight applied to the homework average
    #[arg(long, global = true, env = "GRADES_HOMEWORK_WEIGHT", default_value_t = 0.2)]
    pub homework_weight: f64,
}

impl WeightArgs {
    /// Weights that do not sum to 1.0 are logged and used as given.
    pub fn weights(&self) -> CategoryWeights {
        let weights = CategoryWeights {
            exam: self.exam_weight,
            quiz: self.quiz_weight,
            homework: self.homework_weight,
        };

        if (weights.total() - 1.0).abs() > 1e-9 {
            tracing::warn!(
                exam = weights.exam,
                quiz = weights.quiz,
                homework = weights.homework,
                "category weights sum to {:.3}, expected 1.0",
                weights.total()
            );
        }

        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        weights: WeightArgs,
    }

    #[test]
    fn defaults_match_standard_weights() {
        let harness = Harness::parse_from(["weighted-grades"]);
        assert_eq!(harness.weights.weights(), CategoryWeights::default());
    }

    #[test]
    fn weights_can_be_overridden_individually() {
        let harness = Harness::parse_from(["weighted-grades", "--quiz-weight", "0.1"]);
        let weights = harness.weights.weights();
        assert_eq!(weights.exam, 0.5);
        assert_eq!(weights.quiz, 0.1);
        assert_eq!(weights.homework, 0.2);
    }
}

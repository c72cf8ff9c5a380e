use crate::models::ScoreEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    Exam,
    Quiz,
    Homework,
    Unrecognized,
}

impl ScoreCategory {
    /// Exact, case-sensitive match on the stored tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "exam" => ScoreCategory::Exam,
            "quiz" => ScoreCategory::Quiz,
            "homework" => ScoreCategory::Homework,
            _ => ScoreCategory::Unrecognized,
        }
    }
}

pub fn classify(entry: &ScoreEntry) -> ScoreCategory {
    ScoreCategory::from_tag(&entry.category)
}

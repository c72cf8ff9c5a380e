use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{finite_score, GradeDocument, ScoreEntry, StoredGrade};

#[derive(Debug, Clone, Copy, Default)]
pub struct GradeFilter {
    pub learner_id: Option<i64>,
    pub class_id: Option<i64>,
}

impl GradeFilter {
    pub fn learner(learner_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            class_id: None,
        }
    }

    pub fn class(class_id: i64) -> Self {
        Self {
            learner_id: None,
            class_id: Some(class_id),
        }
    }

    pub fn pair(learner_id: i64, class_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            class_id: Some(class_id),
        }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let tagged = vec![
        (
            "seed-001",
            Some(1),
            Some(101),
            vec![("exam", 80.0), ("exam", 90.0), ("quiz", 70.0), ("homework", 100.0)],
        ),
        (
            "seed-002",
            Some(1),
            Some(102),
            vec![("exam", 100.0), ("homework", 100.0)],
        ),
        (
            "seed-003",
            Some(2),
            Some(101),
            vec![("exam", 55.0), ("quiz", 62.0), ("homework", 48.0), ("lab", 90.0)],
        ),
        ("seed-004", None, Some(101), vec![("exam", 99.0)]),
    ];

    for (source_key, learner_id, class_id, scores) in tagged {
        let document = GradeDocument {
            learner_id,
            class_id,
            scores: scores
                .into_iter()
                .map(|(category, value)| ScoreEntry::new(category, value))
                .collect(),
            ..GradeDocument::default()
        };
        insert_grade(pool, &document, Some(source_key)).await?;
    }

    // Older documents kept one array per category.
    let legacy = GradeDocument {
        learner_id: Some(3),
        class_id: Some(102),
        exam: vec![72.0, 88.0],
        quiz: vec![91.0],
        homework: vec![85.0, 95.0],
        ..GradeDocument::default()
    };
    insert_grade(pool, &legacy, Some("seed-005")).await?;

    Ok(())
}

/// Inserts one grade document with its scores normalised to the tagged
/// shape. A repeated `source_key` leaves the existing row in place and
/// returns `None`.
pub async fn insert_grade(
    pool: &PgPool,
    document: &GradeDocument,
    source_key: Option<&str>,
) -> anyhow::Result<Option<Uuid>> {
    let inserted: Option<Uuid> = sqlx::query(
        r#"
        INSERT INTO weighted_grades.grades (id, learner_id, class_id, scores, source_key)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_key) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(document.learner_id)
    .bind(document.class_id)
    .bind(Json(document.normalized_scores()))
    .bind(source_key)
    .fetch_optional(pool)
    .await?
    .map(|row| row.get("id"));

    Ok(inserted)
}

pub async fn fetch_grades(pool: &PgPool, filter: GradeFilter) -> anyhow::Result<Vec<StoredGrade>> {
    let mut query = String::from(
        "SELECT id, learner_id, class_id, scores, source_key, recorded_at \
         FROM weighted_grades.grades",
    );

    let mut clauses = Vec::new();
    if filter.learner_id.is_some() {
        clauses.push(format!("learner_id = ${}", clauses.len() + 1));
    }
    if filter.class_id.is_some() {
        clauses.push(format!("class_id = ${}", clauses.len() + 1));
    }
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    query.push_str(" ORDER BY recorded_at, id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = filter.learner_id {
        rows = rows.bind(value);
    }
    if let Some(value) = filter.class_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    tracing::debug!(
        learner_id = ?filter.learner_id,
        class_id = ?filter.class_id,
        rows = records.len(),
        "fetched grade documents"
    );

    records.iter().map(stored_grade).collect()
}

pub async fn fetch_grade(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<StoredGrade>> {
    let row = sqlx::query(
        "SELECT id, learner_id, class_id, scores, source_key, recorded_at \
         FROM weighted_grades.grades WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(stored_grade).transpose()
}

fn stored_grade(row: &PgRow) -> anyhow::Result<StoredGrade> {
    let Json(scores): Json<Vec<ScoreEntry>> = row
        .try_get("scores")
        .context("grade row has an unreadable scores column")?;

    Ok(StoredGrade {
        id: row.get("id"),
        source_key: row.get("source_key"),
        recorded_at: row.get("recorded_at"),
        document: GradeDocument {
            learner_id: row.get("learner_id"),
            class_id: row.get("class_id"),
            scores,
            ..GradeDocument::default()
        },
    })
}

#[derive(serde::Deserialize)]
struct CsvRow {
    learner_id: Option<i64>,
    class_id: Option<i64>,
    score_type: String,
    score: f64,
    source_key: Option<String>,
}

/// Parses every CSV row into a single-score document and its source key.
/// Any malformed row, including a NaN or infinite score, fails the whole
/// file before anything is written.
fn read_csv_documents<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> anyhow::Result<Vec<(GradeDocument, String)>> {
    let mut documents = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let score =
            finite_score(row.score).with_context(|| format!("invalid CSV row {}", line + 1))?;
        if row.learner_id.is_none() || row.class_id.is_none() {
            tracing::warn!(row = line + 1, "importing grade without learner or class id");
        }

        let document = GradeDocument {
            learner_id: row.learner_id,
            class_id: row.class_id,
            scores: vec![ScoreEntry::new(row.score_type, score)],
            ..GradeDocument::default()
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        documents.push((document, source_key));
    }

    Ok(documents)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let documents = read_csv_documents(reader)?;
    let mut inserted = 0usize;

    for (document, source_key) in documents.iter() {
        if insert_grade(pool, document, Some(source_key.as_str())).await?.is_some() {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> anyhow::Result<Vec<(GradeDocument, String)>> {
        read_csv_documents(csv::Reader::from_reader(data.as_bytes()))
    }

    #[test]
    fn csv_rows_become_single_score_documents() {
        let documents = parse(
            "learner_id,class_id,score_type,score,source_key\n\
             1,10,exam,88,row-1\n\
             ,10,quiz,70,row-2\n",
        )
        .unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0.learner_id, Some(1));
        assert_eq!(documents[0].0.scores, vec![ScoreEntry::new("exam", 88.0)]);
        assert_eq!(documents[0].1, "row-1");
        assert_eq!(documents[1].0.learner_id, None);
    }

    #[test]
    fn missing_source_key_gets_generated() {
        let documents = parse("learner_id,class_id,score_type,score\n2,3,homework,95\n").unwrap();
        assert!(documents[0].1.starts_with("import-"));
    }

    #[test]
    fn non_finite_csv_scores_are_rejected() {
        for score in ["NaN", "inf", "-inf"] {
            let data = format!("learner_id,class_id,score_type,score\n1,10,exam,{score}\n");
            let err = parse(&data).unwrap_err();
            assert!(err.to_string().contains("invalid CSV row 1"));
        }
    }
}

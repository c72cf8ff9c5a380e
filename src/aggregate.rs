use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{GradeRecord, ScoreEntry};

/// Score entries from every record that shares `key`, flattened in record
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a, K> {
    pub key: K,
    pub entries: Vec<&'a ScoreEntry>,
}

/// Partitions records by `key_fn`. Groups come back in first-seen key order.
pub fn group_by<'a, K, F>(records: &'a [GradeRecord], key_fn: F) -> Vec<Group<'a, K>>
where
    K: Eq + Hash + Clone,
    F: Fn(&GradeRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, K>> = Vec::new();

    for record in records {
        let key = key_fn(record);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                entries: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].entries.extend(record.scores.iter());
    }

    groups
}

pub fn group_by_learner(records: &[GradeRecord]) -> Vec<Group<'_, i64>> {
    group_by(records, |record| record.learner_id)
}

pub fn group_by_learner_class(records: &[GradeRecord]) -> Vec<Group<'_, (i64, i64)>> {
    group_by(records, |record| (record.learner_id, record.class_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(learner_id: i64, class_id: i64, scores: &[(&str, f64)]) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: scores
                .iter()
                .map(|(category, value)| ScoreEntry::new(*category, *value))
                .collect(),
        }
    }

    #[test]
    fn merges_records_for_same_pair() {
        let records = vec![
            record(1, 10, &[("exam", 80.0)]),
            record(2, 10, &[("quiz", 60.0)]),
            record(1, 10, &[("homework", 90.0), ("quiz", 75.0)]),
        ];

        let groups = group_by_learner_class(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, (1, 10));
        assert_eq!(groups[0].entries.len(), 3);
        assert_eq!(groups[0].entries[1].category, "homework");
        assert_eq!(groups[1].key, (2, 10));
    }

    #[test]
    fn learner_groups_span_classes() {
        let records = vec![
            record(7, 1, &[("exam", 80.0)]),
            record(3, 1, &[("exam", 50.0)]),
            record(7, 2, &[("exam", 90.0)]),
        ];

        let groups = group_by_learner(&records);
        let keys: Vec<i64> = groups.iter().map(|group| group.key).collect();
        assert_eq!(keys, vec![7, 3]);
        assert_eq!(groups[0].entries.len(), 2);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_by_learner_class(&[]).is_empty());
    }

    fn record_strategy() -> impl Strategy<Value = GradeRecord> {
        (
            0i64..4,
            0i64..3,
            prop::collection::vec((0u8..4, 0.0f64..100.0), 0..5),
        )
            .prop_map(|(learner_id, class_id, raw)| GradeRecord {
                learner_id,
                class_id,
                scores: raw
                    .into_iter()
                    .map(|(tag, value)| {
                        let category = ["exam", "quiz", "homework", "lab"][tag as usize];
                        ScoreEntry::new(category, value)
                    })
                    .collect(),
            })
    }

    fn sort_key(entry: &ScoreEntry) -> (String, u64) {
        (entry.category.clone(), entry.value.to_bits())
    }

    proptest! {
        /// Property: flattening the groups gives back every entry exactly once.
        #[test]
        fn grouping_preserves_entries(records in prop::collection::vec(record_strategy(), 0..12)) {
            let mut expected: Vec<(String, u64)> = records
                .iter()
                .flat_map(|record| record.scores.iter().map(sort_key))
                .collect();
            let mut flattened: Vec<(String, u64)> = group_by_learner_class(&records)
                .iter()
                .flat_map(|group| group.entries.iter().map(|entry| sort_key(entry)))
                .collect();

            expected.sort();
            flattened.sort();
            prop_assert_eq!(flattened, expected);
        }

        /// Property: every entry in a group came from a record with that key.
        #[test]
        fn groups_only_hold_matching_records(records in prop::collection::vec(record_strategy(), 0..12)) {
            for group in group_by_learner_class(&records) {
                let expected: usize = records
                    .iter()
                    .filter(|record| (record.learner_id, record.class_id) == group.key)
                    .map(|record| record.scores.len())
                    .sum();
                prop_assert_eq!(group.entries.len(), expected);
            }
        }
    }
}

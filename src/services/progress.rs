use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::engine::{MasteryBucket, MasteryRecord, VocabularyItem};

const MASTERED_MIN_CORRECT: i64 = 3;
const MASTERED_MIN_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbProgress {
    #[serde(flatten)]
    pub item: VocabularyItem,
    pub total_attempts: i64,
    pub correct_attempts: i64,
    pub mastery_ratio: Option<f64>,
    pub bucket: MasteryBucket,
    pub last_reviewed: Option<i64>,
}

impl VerbProgress {
    pub fn new(item: VocabularyItem, record: Option<&MasteryRecord>) -> Self {
        Self {
            total_attempts: record.map_or(0, |r| r.total_attempts),
            correct_attempts: record.map_or(0, |r| r.correct_attempts),
            mastery_ratio: record.and_then(MasteryRecord::ratio),
            bucket: MasteryBucket::classify(record),
            last_reviewed: record.map(|r| r.last_reviewed),
            item,
        }
    }
}

/// Weakest tested verbs first, untested verbs last.
pub fn catalog_view(
    items: Vec<VocabularyItem>,
    records: &HashMap<String, MasteryRecord>,
) -> Vec<VerbProgress> {
    let mut rows: Vec<VerbProgress> = items
        .into_iter()
        .map(|item| {
            let record = records.get(&item.id);
            VerbProgress::new(item, record)
        })
        .collect();

    rows.sort_by(|a, b| {
        let by_ratio = match (a.mastery_ratio, b.mastery_ratio) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_ratio.then_with(|| a.item.norwegian.cmp(&b.item.norwegian))
    });
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    pub untested: usize,
    pub weak: usize,
    pub mastered: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_verbs: usize,
    pub verbs_attempted: usize,
    pub mastered_verbs: usize,
    pub accuracy: f64,
    pub total_attempts: i64,
    pub total_correct: i64,
    pub mastery_percentage: f64,
    pub buckets: BucketCounts,
}

fn is_mastered(record: &MasteryRecord) -> bool {
    record.correct_attempts >= MASTERED_MIN_CORRECT
        && record.ratio().is_some_and(|ratio| ratio >= MASTERED_MIN_RATIO)
}

pub fn compute_stats(
    items: &[VocabularyItem],
    records: &HashMap<String, MasteryRecord>,
) -> ProgressStats {
    let mut stats = ProgressStats {
        total_verbs: items.len(),
        ..ProgressStats::default()
    };

    for item in items {
        let record = records.get(&item.id);
        match MasteryBucket::classify(record) {
            MasteryBucket::Untested => stats.buckets.untested += 1,
            MasteryBucket::Weak => stats.buckets.weak += 1,
            MasteryBucket::Mastered => stats.buckets.mastered += 1,
        }

        let Some(record) = record else { continue };
        if record.total_attempts > 0 {
            stats.verbs_attempted += 1;
        }
        if is_mastered(record) {
            stats.mastered_verbs += 1;
        }
        stats.total_attempts += record.total_attempts;
        stats.total_correct += record.correct_attempts;
    }

    if stats.total_attempts > 0 {
        stats.accuracy = stats.total_correct as f64 / stats.total_attempts as f64 * 100.0;
    }
    if stats.verbs_attempted > 0 && stats.total_verbs > 0 {
        let mastered_share = stats.mastered_verbs as f64 / stats.total_verbs as f64 * 100.0;
        stats.mastery_percentage = 0.5 * stats.accuracy + 0.5 * mastered_share;
    }
    stats
}

use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

use crate::engine::types::{ExerciseMode, MasteryBucket, MasteryRecord, ModePolicy, VocabularyItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("vocabulary catalog is empty")]
    EmptyCatalog,
    #[error("a question is already awaiting an answer")]
    QuestionPending,
}

#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub item: &'a VocabularyItem,
    pub mode: ExerciseMode,
    pub bucket: MasteryBucket,
}

#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub untested: Vec<&'a VocabularyItem>,
    pub weak: Vec<&'a VocabularyItem>,
    pub mastered: Vec<&'a VocabularyItem>,
}

/// Splits the catalog by the user's records, keyed by item id.
pub fn partition<'a>(
    items: &'a [VocabularyItem],
    records: &HashMap<String, MasteryRecord>,
) -> Buckets<'a> {
    let mut buckets = Buckets::default();
    for item in items {
        match MasteryBucket::classify(records.get(&item.id)) {
            MasteryBucket::Untested => buckets.untested.push(item),
            MasteryBucket::Weak => buckets.weak.push(item),
            MasteryBucket::Mastered => buckets.mastered.push(item),
        }
    }
    buckets
}

/// Untested first, then weak, then anything in the catalog.
pub fn select_item<'a, R: Rng + ?Sized>(
    items: &'a [VocabularyItem],
    records: &HashMap<String, MasteryRecord>,
    rng: &mut R,
) -> Result<(&'a VocabularyItem, MasteryBucket), SelectError> {
    if items.is_empty() {
        return Err(SelectError::EmptyCatalog);
    }

    let buckets = partition(items, records);

    if let Some(item) = buckets.untested.choose(rng) {
        return Ok((*item, MasteryBucket::Untested));
    }
    if let Some(item) = buckets.weak.choose(rng) {
        return Ok((*item, MasteryBucket::Weak));
    }

    let item = items.choose(rng).ok_or(SelectError::EmptyCatalog)?;
    Ok((item, MasteryBucket::classify(records.get(&item.id))))
}

pub fn choose_mode<R: Rng + ?Sized>(policy: ModePolicy, rng: &mut R) -> ExerciseMode {
    match policy {
        ModePolicy::Fixed(mode) => mode,
        ModePolicy::Random => ExerciseMode::ALL[rng.random_range(0..ExerciseMode::ALL.len())],
    }
}

pub fn select_next<'a, R: Rng + ?Sized>(
    items: &'a [VocabularyItem],
    records: &HashMap<String, MasteryRecord>,
    policy: ModePolicy,
    rng: &mut R,
) -> Result<Selection<'a>, SelectError> {
    let (item, bucket) = select_item(items, records, rng)?;
    let mode = choose_mode(policy, rng);
    Ok(Selection { item, mode, bucket })
}

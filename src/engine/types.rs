use serde::{Deserialize, Serialize};

/// Ratio below which a tested item counts as weak.
pub const WEAK_RATIO_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseMode {
    /// Norwegian term shown, English meaning expected.
    MeaningRecall,
    /// English meaning shown, Norwegian spelling expected.
    SpellingRecall,
    /// Norwegian term shown, "past, past participle" expected.
    TenseRecall,
}

impl ExerciseMode {
    pub const ALL: [ExerciseMode; 3] = [
        ExerciseMode::MeaningRecall,
        ExerciseMode::SpellingRecall,
        ExerciseMode::TenseRecall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeaningRecall => "meaning-recall",
            Self::SpellingRecall => "spelling-recall",
            Self::TenseRecall => "tense-recall",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "meaning-recall" | "nor-to-eng" => Some(Self::MeaningRecall),
            "spelling-recall" | "eng-to-nor" => Some(Self::SpellingRecall),
            "tense-recall" | "tenses" => Some(Self::TenseRecall),
            _ => None,
        }
    }
}

/// Session-scoped rule for picking the exercise mode of each question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ModePolicy {
    Fixed(ExerciseMode),
    #[default]
    Random,
}

impl ModePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed(mode) => mode.as_str(),
            Self::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("random") {
            return Some(Self::Random);
        }
        ExerciseMode::parse(s).map(Self::Fixed)
    }
}

impl From<ModePolicy> for String {
    fn from(value: ModePolicy) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for ModePolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown exercise mode: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: String,
    pub norwegian: String,
    /// `,` separates meaning slots, `/` separates alternatives within a slot.
    pub english_meanings: String,
    pub past: String,
    pub past_participle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

impl VocabularyItem {
    /// Text shown to the learner for the given mode.
    pub fn prompt(&self, mode: ExerciseMode) -> &str {
        match mode {
            ExerciseMode::MeaningRecall | ExerciseMode::TenseRecall => &self.norwegian,
            ExerciseMode::SpellingRecall => &self.english_meanings,
        }
    }

    /// Canonical answer shown in feedback for the given mode.
    pub fn displayed_answer(&self, mode: ExerciseMode) -> String {
        match mode {
            ExerciseMode::MeaningRecall => self.english_meanings.clone(),
            ExerciseMode::SpellingRecall => self.norwegian.clone(),
            ExerciseMode::TenseRecall => format!("{}, {}", self.past, self.past_participle),
        }
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub user_id: String,
    pub item_id: String,
    pub total_attempts: i64,
    pub correct_attempts: i64,
    /// Milliseconds since the Unix epoch.
    pub last_reviewed: i64,
}

impl MasteryRecord {
    pub fn ratio(&self) -> Option<f64> {
        mastery_ratio(self)
    }

    pub fn bucket(&self) -> MasteryBucket {
        MasteryBucket::classify(Some(self))
    }
}

/// `None` means "no data yet" and is distinct from a 0% ratio.
pub fn mastery_ratio(record: &MasteryRecord) -> Option<f64> {
    if record.total_attempts > 0 {
        Some(record.correct_attempts as f64 / record.total_attempts as f64)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryBucket {
    Untested,
    Weak,
    Mastered,
}

impl MasteryBucket {
    pub fn classify(record: Option<&MasteryRecord>) -> Self {
        let Some(record) = record else {
            return Self::Untested;
        };
        match record.ratio() {
            Some(ratio) if ratio >= WEAK_RATIO_THRESHOLD => Self::Mastered,
            // A record with zero attempts only exists if seeded by hand; treat as weak.
            _ => Self::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untested => "untested",
            Self::Weak => "weak",
            Self::Mastered => "mastered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: i64, correct: i64) -> MasteryRecord {
        MasteryRecord {
            user_id: "u".into(),
            item_id: "v".into(),
            total_attempts: total,
            correct_attempts: correct,
            last_reviewed: 0,
        }
    }

    #[test]
    fn ratio_is_none_without_attempts() {
        assert_eq!(mastery_ratio(&record(0, 0)), None);
    }

    #[test]
    fn ratio_zero_is_not_none() {
        assert_eq!(mastery_ratio(&record(4, 0)), Some(0.0));
    }

    #[test]
    fn ratio_is_exact_quotient() {
        assert_eq!(mastery_ratio(&record(3, 2)), Some(2.0 / 3.0));
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(MasteryBucket::classify(None), MasteryBucket::Untested);
        assert_eq!(record(10, 6).bucket(), MasteryBucket::Weak);
        assert_eq!(record(10, 7).bucket(), MasteryBucket::Mastered);
        assert_eq!(record(1, 1).bucket(), MasteryBucket::Mastered);
    }

    #[test]
    fn mode_policy_parsing() {
        assert_eq!(ModePolicy::parse("random"), Some(ModePolicy::Random));
        assert_eq!(
            ModePolicy::parse("Tense-Recall"),
            Some(ModePolicy::Fixed(ExerciseMode::TenseRecall))
        );
        assert_eq!(
            ModePolicy::parse("nor-to-eng"),
            Some(ModePolicy::Fixed(ExerciseMode::MeaningRecall))
        );
        assert_eq!(ModePolicy::parse("flashcards"), None);
    }

    #[test]
    fn mode_policy_serde_uses_plain_strings() {
        let json = serde_json::to_string(&ModePolicy::Fixed(ExerciseMode::SpellingRecall)).unwrap();
        assert_eq!(json, "\"spelling-recall\"");
        let parsed: ModePolicy = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(parsed, ModePolicy::Random);
    }

    #[test]
    fn tense_displayed_answer_joins_forms() {
        let item = VocabularyItem {
            id: "1".into(),
            norwegian: "å gjøre".into(),
            english_meanings: "to make, to do".into(),
            past: "gjorde".into(),
            past_participle: "gjort".into(),
            mnemonic: Some("   ".into()),
        };
        assert_eq!(item.displayed_answer(ExerciseMode::TenseRecall), "gjorde, gjort");
        assert_eq!(item.prompt(ExerciseMode::SpellingRecall), "to make, to do");
        assert_eq!(item.mnemonic(), None);
    }
}

use crate::db::operations::catalog;
use crate::db::Database;
use crate::engine::VocabularyItem;

struct SeedVerb {
    id: &'static str,
    norwegian: &'static str,
    english_meanings: &'static str,
    past: &'static str,
    past_participle: &'static str,
    mnemonic: Option<&'static str>,
}

#[rustfmt::skip]
const SEED_VERBS: &[SeedVerb] = &[
    SeedVerb { id: "gjore", norwegian: "å gjøre", english_meanings: "to make, to do", past: "gjorde", past_participle: "gjort", mnemonic: Some("Gjøre sounds like 'do-er': someone who does things.") },
    SeedVerb { id: "vaere", norwegian: "å være", english_meanings: "to be", past: "var", past_participle: "vært", mnemonic: Some("'Var' is close to English 'was'.") },
    SeedVerb { id: "ha", norwegian: "å ha", english_meanings: "to have", past: "hadde", past_participle: "hatt", mnemonic: Some("'Ha' is 'have' with the end cut off.") },
    SeedVerb { id: "si", norwegian: "å si", english_meanings: "to say/to tell", past: "sa", past_participle: "sagt", mnemonic: Some("'Sagt' looks like 'said'.") },
    SeedVerb { id: "gaa", norwegian: "å gå", english_meanings: "to go, to walk", past: "gikk", past_participle: "gått", mnemonic: Some("Think 'go' with a Nordic ring on the vowel.") },
    SeedVerb { id: "komme", norwegian: "å komme", english_meanings: "to come", past: "kom", past_participle: "kommet", mnemonic: Some("'Komme' is almost 'come'.") },
    SeedVerb { id: "se", norwegian: "å se", english_meanings: "to see", past: "så", past_participle: "sett", mnemonic: Some("'Se' sounds exactly like 'see'.") },
    SeedVerb { id: "ta", norwegian: "å ta", english_meanings: "to take", past: "tok", past_participle: "tatt", mnemonic: Some("'Tok' rhymes with 'took'.") },
    SeedVerb { id: "gi", norwegian: "å gi", english_meanings: "to give", past: "ga", past_participle: "gitt", mnemonic: Some("'Gi' is 'give' without the tail.") },
    SeedVerb { id: "vite", norwegian: "å vite", english_meanings: "to know", past: "visste", past_participle: "visst", mnemonic: Some("A 'wit' is someone who knows things.") },
    SeedVerb { id: "finne", norwegian: "å finne", english_meanings: "to find", past: "fant", past_participle: "funnet", mnemonic: Some("'Finne' looks like 'find'.") },
    SeedVerb { id: "skrive", norwegian: "å skrive", english_meanings: "to write", past: "skrev", past_participle: "skrevet", mnemonic: Some("A scribe writes: 'skrive'.") },
    SeedVerb { id: "spise", norwegian: "å spise", english_meanings: "to eat", past: "spiste", past_participle: "spist", mnemonic: Some("Spices make you want to eat.") },
    SeedVerb { id: "drikke", norwegian: "å drikke", english_meanings: "to drink", past: "drakk", past_participle: "drukket", mnemonic: Some("'Drukket' is how you feel after too much 'drink'.") },
    SeedVerb { id: "sove", norwegian: "å sove", english_meanings: "to sleep", past: "sov", past_participle: "sovet", mnemonic: None },
    SeedVerb { id: "lese", norwegian: "å lese", english_meanings: "to read", past: "leste", past_participle: "lest", mnemonic: Some("A lecture is something read aloud.") },
    SeedVerb { id: "snakke", norwegian: "å snakke", english_meanings: "to speak/to talk", past: "snakket", past_participle: "snakket", mnemonic: Some("Snakes hiss while they talk.") },
    SeedVerb { id: "forstaa", norwegian: "å forstå", english_meanings: "to understand", past: "forstod", past_participle: "forstått", mnemonic: Some("'For-stå' mirrors 'under-stand'.") },
    SeedVerb { id: "bli", norwegian: "å bli", english_meanings: "to become, to stay", past: "ble", past_participle: "blitt", mnemonic: None },
    SeedVerb { id: "legge", norwegian: "å legge", english_meanings: "to lay/to put", past: "la", past_participle: "lagt", mnemonic: Some("You lay something down on your leg.") },
    SeedVerb { id: "sette", norwegian: "å sette", english_meanings: "to set/to place, to put", past: "satte", past_participle: "satt", mnemonic: Some("'Sette' is 'set'.") },
    SeedVerb { id: "sitte", norwegian: "å sitte", english_meanings: "to sit", past: "satt", past_participle: "sittet", mnemonic: Some("'Sitte' is 'sit' with a Norwegian ending.") },
    SeedVerb { id: "ligge", norwegian: "å ligge", english_meanings: "to lie (be lying down)", past: "lå", past_participle: "ligget", mnemonic: None },
    SeedVerb { id: "sette-inn", norwegian: "å sette inn", english_meanings: "to insert, to deposit", past: "satte inn", past_participle: "satt inn", mnemonic: Some("Set something in: insert it.") },
];

pub fn builtin_catalog() -> Vec<VocabularyItem> {
    SEED_VERBS
        .iter()
        .map(|verb| VocabularyItem {
            id: verb.id.to_string(),
            norwegian: verb.norwegian.to_string(),
            english_meanings: verb.english_meanings.to_string(),
            past: verb.past.to_string(),
            past_participle: verb.past_participle.to_string(),
            mnemonic: verb.mnemonic.map(str::to_string),
        })
        .collect()
}

/// Loads the built-in verbs when the catalog table is empty.
pub async fn seed_catalog(db: &Database) -> Result<u64, sqlx::Error> {
    let pool = db.pool();
    let existing = catalog::count_items(pool).await?;
    if existing > 0 {
        tracing::debug!(existing, "verb catalog already seeded");
        return Ok(0);
    }

    let inserted = catalog::insert_items(pool, &builtin_catalog()).await?;
    tracing::info!(inserted, "seeded verb catalog");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::engine::grader::expand_alternatives;

    #[test]
    fn builtin_catalog_has_unique_ids_and_terms() {
        let items = builtin_catalog();
        let ids: HashSet<_> = items.iter().map(|i| i.id.as_str()).collect();
        let terms: HashSet<_> = items.iter().map(|i| i.norwegian.as_str()).collect();
        assert_eq!(ids.len(), items.len());
        assert_eq!(terms.len(), items.len());
    }

    #[test]
    fn builtin_catalog_is_gradeable() {
        for item in builtin_catalog() {
            assert!(!expand_alternatives(&item.english_meanings).is_empty(), "{}", item.id);
            assert!(!item.past.contains(','), "{}", item.id);
            assert!(!item.past_participle.contains(','), "{}", item.id);
        }
    }
}

//! Trigger phrases, numeral words and native digits
//!
//! The table is built once at startup and never mutated. Phrases are kept
//! in normalized form so the matcher can compare them against normalized
//! transcripts directly.

use serde::Deserialize;

use super::normalize;

/// One spoken variant of a command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerEntry {
    /// Command this phrase dispatches (e.g. "sit")
    #[serde(rename = "action")]
    pub action_key: String,
    /// Literal phrase in the command language
    pub phrase: String,
}

impl TriggerEntry {
    pub fn new(action_key: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            action_key: action_key.into(),
            phrase: phrase.into(),
        }
    }
}

/// A spoken word for a digit between 1 and 10
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NumeralEntry {
    pub word: String,
    pub value: u8,
}

impl NumeralEntry {
    pub fn new(word: impl Into<String>, value: u8) -> Self {
        Self {
            word: word.into(),
            value,
        }
    }
}

/// Native-script digit characters
///
/// `one` is the code point for 1; 2..=9 follow it contiguously. Scripts with
/// a dedicated ten sign set `ten`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeDigits {
    pub one: char,
    pub ten: Option<char>,
}

/// Tamil digits ௧..௯ and the ten sign ௰
pub const TAMIL_DIGITS: NativeDigits = NativeDigits {
    one: '\u{0BE7}',
    ten: Some('\u{0BF0}'),
};

impl NativeDigits {
    /// Value of a single native digit character, if it is one of 1..=10
    pub fn value_of(&self, c: char) -> Option<u8> {
        if Some(c) == self.ten {
            return Some(10);
        }
        let offset = (c as u32).checked_sub(self.one as u32)?;
        if offset < 9 {
            Some(offset as u8 + 1)
        } else {
            None
        }
    }

    /// Whether `c` belongs to the native digit range (including zero)
    pub fn is_digit(&self, c: char) -> bool {
        let zero = self.one as u32 - 1;
        let code = c as u32;
        (zero..zero + 10).contains(&code) || Some(c) == self.ten
    }
}

/// Errors raised while building a table from configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("trigger entry has an empty action key")]
    EmptyActionKey,

    #[error("trigger phrase for action '{0}' is empty")]
    EmptyPhrase(String),

    #[error("numeral entry has an empty word")]
    EmptyWord,

    #[error("numeral '{word}' has value {value}, expected 1..=10")]
    NumeralOutOfRange { word: String, value: u8 },
}

/// Immutable command vocabulary
#[derive(Debug, Clone)]
pub struct TriggerTable {
    /// Trigger entries, longest phrase first
    actions: Vec<TriggerEntry>,
    /// Distinct action keys in declaration order
    action_keys: Vec<String>,
    /// Numeral words in declaration order
    numerals: Vec<NumeralEntry>,
    native_digits: Option<NativeDigits>,
}

impl TriggerTable {
    /// Build a table, normalizing every phrase and word
    ///
    /// Trigger entries are stably sorted by descending phrase length so that
    /// a phrase always wins over any shorter phrase it contains. Entries of
    /// equal length keep their declared order.
    pub fn new(
        actions: Vec<TriggerEntry>,
        numerals: Vec<NumeralEntry>,
        native_digits: Option<NativeDigits>,
    ) -> Result<Self, TableError> {
        let mut action_keys: Vec<String> = Vec::new();
        let mut normalized = Vec::with_capacity(actions.len());

        for entry in actions {
            let action_key = entry.action_key.trim().to_string();
            if action_key.is_empty() {
                return Err(TableError::EmptyActionKey);
            }
            let phrase = normalize(&entry.phrase);
            if phrase.is_empty() {
                return Err(TableError::EmptyPhrase(action_key));
            }
            if !action_keys.contains(&action_key) {
                action_keys.push(action_key.clone());
            }
            normalized.push(TriggerEntry { action_key, phrase });
        }

        normalized.sort_by(|a, b| b.phrase.chars().count().cmp(&a.phrase.chars().count()));

        let numerals = numerals
            .into_iter()
            .map(|entry| {
                let word = normalize(&entry.word);
                if word.is_empty() {
                    return Err(TableError::EmptyWord);
                }
                if !(1..=10).contains(&entry.value) {
                    return Err(TableError::NumeralOutOfRange {
                        word,
                        value: entry.value,
                    });
                }
                Ok(NumeralEntry {
                    word,
                    value: entry.value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            actions: normalized,
            action_keys,
            numerals,
            native_digits,
        })
    }

    /// Built-in Tamil vocabulary
    pub fn tamil() -> Self {
        // The built-in entries are all non-empty and in range.
        match Self::new(tamil_actions(), tamil_numerals(), Some(TAMIL_DIGITS)) {
            Ok(table) => table,
            Err(e) => unreachable!("built-in trigger table is invalid: {e}"),
        }
    }

    /// Trigger entries ordered longest phrase first
    pub fn all_actions(&self) -> &[TriggerEntry] {
        &self.actions
    }

    /// Numeral words in lexicon order
    pub fn all_numerals(&self) -> &[NumeralEntry] {
        &self.numerals
    }

    /// Distinct action keys in declaration order
    pub fn actions(&self) -> &[String] {
        &self.action_keys
    }

    pub fn native_digits(&self) -> Option<NativeDigits> {
        self.native_digits
    }

    /// Whether `key` names a configured action
    pub fn has_action(&self, key: &str) -> bool {
        self.action_keys.iter().any(|k| k == key)
    }
}

impl Default for TriggerTable {
    fn default() -> Self {
        Self::tamil()
    }
}

/// Built-in Tamil trigger phrases: sit, walk, dance and jump with inflected variants
pub fn tamil_actions() -> Vec<TriggerEntry> {
    [
        ("sit", "உக்காரு"),
        ("sit", "உட்காரு"),
        ("sit", "உட்கார்"),
        ("sit", "உக்கார்"),
        ("sit", "உட்காருங்கள்"),
        ("sit", "உக்காருங்க"),
        ("walk", "நட"),
        ("walk", "நடந்து"),
        ("walk", "நடங்கள்"),
        ("walk", "நடங்க"),
        ("walk", "நடந்து போ"),
        ("dance", "ஆடு"),
        ("dance", "ஆடுங்கள்"),
        ("dance", "ஆடுங்க"),
        ("dance", "நடனம்"),
        ("dance", "டான்ஸ்"),
        ("jump", "குதி"),
        ("jump", "குதிங்கள்"),
        ("jump", "குதிங்க"),
        ("jump", "தாவு"),
    ]
    .into_iter()
    .map(|(key, phrase)| TriggerEntry::new(key, phrase))
    .collect()
}

/// Built-in Tamil numeral words, formal and colloquial spellings
pub fn tamil_numerals() -> Vec<NumeralEntry> {
    [
        ("ஒன்று", 1),
        ("ஒண்ணு", 1),
        ("இரண்டு", 2),
        ("ரெண்டு", 2),
        ("மூன்று", 3),
        ("மூணு", 3),
        ("நான்கு", 4),
        ("நாலு", 4),
        ("ஐந்து", 5),
        ("அஞ்சு", 5),
        ("ஆறு", 6),
        ("ஏழு", 7),
        ("எட்டு", 8),
        ("ஒன்பது", 9),
        ("பத்து", 10),
    ]
    .into_iter()
    .map(|(word, value)| NumeralEntry::new(word, value))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_sorted_longest_first() {
        let table = TriggerTable::tamil();
        let lengths: Vec<usize> = table
            .all_actions()
            .iter()
            .map(|e| e.phrase.chars().count())
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_equal_length_keeps_declared_order() {
        let table = TriggerTable::new(
            vec![
                TriggerEntry::new("a", "xy"),
                TriggerEntry::new("b", "long phrase"),
                TriggerEntry::new("c", "zw"),
            ],
            vec![],
            None,
        )
        .unwrap();
        let keys: Vec<&str> = table
            .all_actions()
            .iter()
            .map(|e| e.action_key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_action_keys_in_declaration_order() {
        let table = TriggerTable::tamil();
        assert_eq!(table.actions(), &["sit", "walk", "dance", "jump"]);
        assert!(table.has_action("jump"));
        assert!(!table.has_action("fly"));
    }

    #[test]
    fn test_numerals_keep_insertion_order() {
        let table = TriggerTable::tamil();
        let first = &table.all_numerals()[0];
        assert_eq!(first.word, "ஒன்று");
        assert_eq!(first.value, 1);
        assert_eq!(table.all_numerals().last().unwrap().value, 10);
    }

    #[test]
    fn test_phrases_are_normalized() {
        let table = TriggerTable::new(
            vec![TriggerEntry::new(" walk ", "  Walk   Forward ")],
            vec![],
            None,
        )
        .unwrap();
        assert_eq!(table.all_actions()[0].action_key, "walk");
        assert_eq!(table.all_actions()[0].phrase, "walk forward");
    }

    #[test]
    fn test_rejects_invalid_entries() {
        assert_eq!(
            TriggerTable::new(vec![TriggerEntry::new("sit", "   ")], vec![], None).unwrap_err(),
            TableError::EmptyPhrase("sit".into())
        );
        assert_eq!(
            TriggerTable::new(vec![TriggerEntry::new("", "x")], vec![], None).unwrap_err(),
            TableError::EmptyActionKey
        );
        assert!(matches!(
            TriggerTable::new(vec![], vec![NumeralEntry::new("eleven", 11)], None),
            Err(TableError::NumeralOutOfRange { value: 11, .. })
        ));
        assert!(matches!(
            TriggerTable::new(vec![], vec![NumeralEntry::new("zero", 0)], None),
            Err(TableError::NumeralOutOfRange { value: 0, .. })
        ));
    }

    #[test]
    fn test_tamil_digits() {
        assert_eq!(TAMIL_DIGITS.value_of('௧'), Some(1));
        assert_eq!(TAMIL_DIGITS.value_of('௯'), Some(9));
        assert_eq!(TAMIL_DIGITS.value_of('௰'), Some(10));
        assert_eq!(TAMIL_DIGITS.value_of('௦'), None);
        assert_eq!(TAMIL_DIGITS.value_of('a'), None);
        assert!(TAMIL_DIGITS.is_digit('௦'));
        assert!(!TAMIL_DIGITS.is_digit('7'));
    }
}

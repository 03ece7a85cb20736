//! Transcript → action resolution
//!
//! Resolution order, first hit wins:
//! 1. digit token (ASCII 1..=10 or a single native-script digit)
//! 2. numeral word, in lexicon order
//! 3. trigger phrase, longest phrase first
//!
//! Phrases and words are tested as whole words: the match must be bounded
//! by the start/end of the transcript or by a character that is neither a
//! Unicode letter nor a combining mark. Marks count as part of a word so a
//! consonant followed by a vowel sign is never treated as a boundary.

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::triggers::{normalize, NativeDigits, TriggerTable};

/// Outcome of matching one transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// A trigger phrase for this action key was found
    Action(String),
    /// A spoken or written digit 1..=10 was found
    Numeral(u8),
    /// Nothing configured was heard
    NoMatch,
}

/// How phrase containment is tested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Whole-word test, degrading per phrase to substring if its pattern
    /// cannot be built
    #[default]
    WholeWord,
    /// Plain substring containment everywhere
    ///
    /// Short phrases embedded in longer unrelated words will match. This is
    /// the degradation path for runtimes without Unicode-aware patterns.
    Substring,
}

/// Letters, combining marks and digits of any script
const WORD_CHAR: &str = r"^[\p{L}\p{M}\p{N}]$";

/// A phrase with its optional whole-word pattern
#[derive(Debug)]
struct PhraseTest {
    text: String,
    pattern: Option<Regex>,
}

impl PhraseTest {
    fn new(text: &str, mode: BoundaryMode) -> Self {
        let pattern = match mode {
            BoundaryMode::Substring => None,
            BoundaryMode::WholeWord => {
                let source = format!(
                    r"(?:^|[^\p{{L}}\p{{M}}]){}(?:[^\p{{L}}\p{{M}}]|$)",
                    regex::escape(text)
                );
                match Regex::new(&source) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(phrase = text, error = %e, "whole-word pattern unavailable, using substring match");
                        None
                    }
                }
            }
        };

        Self {
            text: text.to_string(),
            pattern,
        }
    }

    fn is_in(&self, haystack: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(haystack),
            None => haystack.contains(&self.text),
        }
    }
}

/// Pure transcript matcher built from a trigger table
#[derive(Debug)]
pub struct TranscriptMatcher {
    numerals: Vec<(PhraseTest, u8)>,
    actions: Vec<(PhraseTest, String)>,
    native_digits: Option<NativeDigits>,
    /// Characters that continue a word around a digit token
    word_char: Option<Regex>,
}

impl TranscriptMatcher {
    /// Create a matcher with the given boundary mode
    pub fn new(table: &TriggerTable, mode: BoundaryMode) -> Self {
        let numerals = table
            .all_numerals()
            .iter()
            .map(|n| (PhraseTest::new(&n.word, mode), n.value))
            .collect();

        let actions = table
            .all_actions()
            .iter()
            .map(|e| (PhraseTest::new(&e.phrase, mode), e.action_key.clone()))
            .collect();

        let word_char = match Regex::new(WORD_CHAR) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "word character class unavailable, using alphanumeric test");
                None
            }
        };

        Self {
            numerals,
            actions,
            native_digits: table.native_digits(),
            word_char,
        }
    }

    /// Resolve a transcript to a result
    pub fn match_transcript(&self, transcript: &str) -> MatchResult {
        let text = normalize(transcript);
        if text.is_empty() {
            return MatchResult::NoMatch;
        }

        let result = self.resolve(&text);
        debug!(transcript = %text, ?result, "transcript matched");
        result
    }

    fn resolve(&self, text: &str) -> MatchResult {
        if let Some(value) = self.find_digit(text) {
            return MatchResult::Numeral(value);
        }

        if let Some((_, value)) = self.numerals.iter().find(|(test, _)| test.is_in(text)) {
            return MatchResult::Numeral(*value);
        }

        if let Some((_, key)) = self.actions.iter().find(|(test, _)| test.is_in(text)) {
            return MatchResult::Action(key.clone());
        }

        MatchResult::NoMatch
    }

    /// Find the first digit token with value 1..=10
    ///
    /// An ASCII token is a maximal run of ASCII digits without a leading
    /// zero. A native token is a single native digit. Either must be bounded
    /// on both sides by the text edge or a character that is not a letter,
    /// combining mark or digit.
    fn find_digit(&self, text: &str) -> Option<u8> {
        let chars: Vec<char> = text.chars().collect();
        let is_edge = |at: Option<usize>| {
            at.and_then(|j| chars.get(j))
                .map_or(true, |&c| !self.is_word_char(c))
        };

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];

            if c.is_ascii_digit() {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if is_edge(start.checked_sub(1)) && is_edge(Some(i)) && c != '0' {
                    let token: String = chars[start..i].iter().collect();
                    if let Ok(value @ 1..=10) = token.parse::<u8>() {
                        return Some(value);
                    }
                }
                continue;
            }

            if let Some(value) = self.native_digits.and_then(|native| native.value_of(c)) {
                if is_edge(i.checked_sub(1)) && is_edge(Some(i + 1)) {
                    return Some(value);
                }
            }

            i += 1;
        }

        None
    }

    fn is_word_char(&self, c: char) -> bool {
        match &self.word_char {
            Some(re) => {
                let mut buf = [0u8; 4];
                re.is_match(c.encode_utf8(&mut buf))
            }
            None => c.is_alphanumeric(),
        }
    }
}

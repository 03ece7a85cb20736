//! Command vocabulary: trigger phrases, numeral words and native digits
//!
//! The trigger table is the leaf of the recognition pipeline. It holds the
//! phrases that dispatch animation actions and the lexicon of spoken digits.

mod table;

pub use table::{
    tamil_actions, tamil_numerals, NativeDigits, NumeralEntry, TriggerEntry,
    TriggerTable, TAMIL_DIGITS,
};

/// Normalize text for matching: trim, collapse whitespace runs, case-fold
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Sit   DOWN \t now\n"), "sit down now");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("உக்காரு"), "உக்காரு");
    }
}

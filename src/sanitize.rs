//! Input sanitization.
//!
//! Raw input is case-folded and every character from [`STRIPPED_CHARS`] is
//! replaced by one space. Runs of spaces are left alone; the resolver's tiers
//! each decide how to treat whitespace.
//!
//! The digit `0` is not in the stripped set, so `"Chad0"` keeps its zero while
//! `"Chad2"` loses its two. Dictionaries built against this behavior rely on
//! it.

use crate::error::InputError;

/// Characters replaced with a space during sanitization.
pub const STRIPPED_CHARS: [char; 37] = [
    ',', '.', '/', '!', '?', '<', '>', '[', ']', '|', '(', ')', '+', '=', '_', '*', '&', '%', ';',
    '№', '~', '@', '#', '$', '{', '}', '-', '`', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

fn is_stripped(c: char) -> bool {
    STRIPPED_CHARS.contains(&c)
}

/// Case-folds `raw` and blanks out punctuation and the digits 1-9.
///
/// # Errors
/// `InputError::Empty` if `raw` is blank, `InputError::EmptyAfterSanitize` if
/// nothing but whitespace survives.
pub fn sanitize(raw: &str) -> Result<String, InputError> {
    if raw.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if is_stripped(c) { ' ' } else { c })
        .collect();

    if cleaned.trim().is_empty() {
        return Err(InputError::EmptyAfterSanitize {
            raw: raw.to_string(),
        });
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases() {
        assert_eq!(sanitize("RUSSIA").unwrap(), "russia");
        assert_eq!(sanitize("Россия").unwrap(), "россия");
    }

    #[test]
    fn test_replaces_punctuation_with_spaces() {
        assert_eq!(sanitize("U.S.A.").unwrap(), "u s a ");
        assert_eq!(sanitize("Guinea-Bissau").unwrap(), "guinea bissau");
        assert_eq!(sanitize("(Korea), Rep.").unwrap(), " korea   rep ");
        assert_eq!(sanitize("№1 Côte d'Ivoire").unwrap(), "   côte d'ivoire");
    }

    #[test]
    fn test_keeps_repeated_spaces() {
        assert_eq!(sanitize("new  zealand").unwrap(), "new  zealand");
    }

    #[test]
    fn test_digit_zero_is_kept() {
        assert_eq!(sanitize("Chad2").unwrap(), "chad ");
        assert_eq!(sanitize("Chad0").unwrap(), "chad0");
        assert_eq!(sanitize("1234567890").unwrap(), "         0");
    }

    #[test]
    fn test_rejects_blank_input() {
        assert_eq!(sanitize("").unwrap_err(), InputError::Empty);
        assert_eq!(sanitize("   \t").unwrap_err(), InputError::Empty);
    }

    #[test]
    fn test_rejects_input_that_sanitizes_to_nothing() {
        let err = sanitize("!?-- 42").unwrap_err();
        assert!(matches!(err, InputError::EmptyAfterSanitize { .. }));
    }

    #[test]
    fn test_is_pure() {
        let raw = "The Republic of Côte-d'Ivoire (2)";
        assert_eq!(sanitize(raw).unwrap(), sanitize(raw).unwrap());
    }
}

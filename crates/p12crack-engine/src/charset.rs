//! Alphabet construction for brute-force mode
//!
//! Token classes, concatenated in the order given:
//!   a = abcdefghijklmnopqrstuvwxyz
//!   A = ABCDEFGHIJKLMNOPQRSTUVWXYZ
//!   n = 0123456789
//!   s = !"#$%&'()*+,-./:;<=>?@[\]^_`{|}~ and blank
//!   x = all of the above, in that order

use p12crack_core::{CrackError, CrackResult};
use std::fmt;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SPECIALS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ ";

/// Ordered alphabet with no repeated symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    symbols: Vec<char>,
}

impl Charset {
    /// The `x` alphabet: lowercase, uppercase, digits, specials.
    pub fn full() -> Self {
        let mut symbols = Vec::with_capacity(95);
        for class in [LOWERCASE, UPPERCASE, DIGITS, SPECIALS] {
            symbols.extend(class.chars());
        }
        Self { symbols }
    }

    /// Build from class tokens. A repeated token is ignored; `x` returns the
    /// full alphabet at once, whatever preceded it and whatever follows.
    pub fn from_tokens(tokens: &str) -> CrackResult<Self> {
        let mut symbols = Vec::new();
        let mut seen = [false; 4];

        for token in tokens.chars() {
            let (slot, class) = match token {
                'a' => (0, LOWERCASE),
                'A' => (1, UPPERCASE),
                'n' => (2, DIGITS),
                's' => (3, SPECIALS),
                'x' => return Ok(Self::full()),
                other => {
                    return Err(CrackError::config(format!(
                        "unrecognized charset token {other:?} (expected a, A, n, s or x)"
                    )))
                }
            };
            if !seen[slot] {
                seen[slot] = true;
                symbols.extend(class.chars());
            }
        }

        if symbols.is_empty() {
            return Err(CrackError::config("no character set selected"));
        }
        Ok(Self { symbols })
    }

    /// Use `alphabet` verbatim, dropping repeated symbols but keeping the
    /// order of first appearance.
    pub fn from_literal(alphabet: &str) -> CrackResult<Self> {
        let mut symbols: Vec<char> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if !symbols.contains(&c) {
                symbols.push(c);
            }
        }

        if symbols.is_empty() {
            return Err(CrackError::config("explicit alphabet is empty"));
        }
        Ok(Self { symbols })
    }

    /// Resolve the alphabet from the mutually exclusive `-c` tokens and `-s`
    /// literal, falling back to `default_tokens` when neither is given.
    pub fn resolve(
        tokens: Option<&str>,
        literal: Option<&str>,
        default_tokens: &str,
    ) -> CrackResult<Self> {
        match (tokens, literal) {
            (Some(_), Some(_)) => Err(CrackError::config(
                "charset tokens and an explicit alphabet are mutually exclusive",
            )),
            (None, Some(literal)) => Self::from_literal(literal),
            (Some(tokens), None) => Self::from_tokens(tokens),
            (None, None) => Self::from_tokens(default_tokens),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    #[inline]
    pub fn symbol(&self, index: usize) -> char {
        self.symbols[index]
    }

    pub fn contains_blank(&self) -> bool {
        self.symbols.contains(&' ')
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.symbols {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_concatenate_in_order() {
        let cs = Charset::from_tokens("na").unwrap();
        assert_eq!(cs.to_string(), format!("{DIGITS}{LOWERCASE}"));
    }

    #[test]
    fn duplicate_token_is_a_no_op() {
        assert_eq!(Charset::from_tokens("aAa").unwrap(), Charset::from_tokens("aA").unwrap());
    }

    #[test]
    fn x_short_circuits() {
        let full = Charset::full();
        assert_eq!(full.len(), 26 + 26 + 10 + 33);
        assert_eq!(Charset::from_tokens("x").unwrap(), full);
        assert_eq!(Charset::from_tokens("nsx").unwrap(), full);
        // tokens after x are never looked at
        assert_eq!(Charset::from_tokens("x?").unwrap(), full);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = Charset::from_tokens("aq").unwrap_err();
        assert!(matches!(err, CrackError::Config(_)));
        assert!(Charset::from_tokens("").is_err());
    }

    #[test]
    fn specials_include_blank() {
        let cs = Charset::from_tokens("s").unwrap();
        assert!(cs.contains_blank());
        assert!(!Charset::from_tokens("aAn").unwrap().contains_blank());
    }

    #[test]
    fn literal_is_deduplicated_in_order() {
        let cs = Charset::from_literal("abcabd").unwrap();
        assert_eq!(cs.symbols(), &['a', 'b', 'c', 'd']);
        assert!(Charset::from_literal("").is_err());
    }

    #[test]
    fn resolve_enforces_mutual_exclusion() {
        assert!(Charset::resolve(Some("a"), Some("xyz"), "x").is_err());
        assert_eq!(Charset::resolve(None, None, "x").unwrap(), Charset::full());
        assert_eq!(Charset::resolve(None, Some("ba"), "x").unwrap().to_string(), "ba");
        assert_eq!(Charset::resolve(Some("n"), None, "x").unwrap().to_string(), DIGITS);
    }

    proptest! {
        /// No symbol ever appears twice, whichever tokens are combined
        #[test]
        fn token_alphabets_have_no_duplicates(tokens in "[aAnsx]{1,12}") {
            let cs = Charset::from_tokens(&tokens).unwrap();
            let unique: HashSet<char> = cs.symbols().iter().copied().collect();
            prop_assert_eq!(unique.len(), cs.len());
            if tokens.contains('x') {
                prop_assert_eq!(cs, Charset::full());
            }
        }

        #[test]
        fn literal_alphabets_have_no_duplicates(alphabet in "\\PC{1,40}") {
            let cs = Charset::from_literal(&alphabet).unwrap();
            let unique: HashSet<char> = cs.symbols().iter().copied().collect();
            prop_assert_eq!(unique.len(), cs.len());
            for c in alphabet.chars() {
                prop_assert!(cs.symbols().contains(&c));
            }
        }
    }
}

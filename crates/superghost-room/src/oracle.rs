//! Word validation.
//!
//! A room asks a [`WordOracle`] whether a candidate is a real word. The
//! oracle is the only collaborator that can fail for reasons outside the
//! caller's control; when it does, the room abandons the action.

use std::collections::HashSet;
use std::future::{Future, ready};
use std::sync::Arc;

/// The oracle could not answer.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("{0}")]
    Unavailable(String),
}

/// Decides whether a candidate string is a word.
///
/// `candidate` is upper-case. `used` holds words already won this game
/// when repeats are disallowed (empty otherwise); a candidate in `used`
/// must be reported as not a word.
///
/// Implementations can be local (see [`Dictionary`]) or call out over
/// the network:
///
/// ```rust,ignore
/// impl WordOracle for HttpDictionary {
///     async fn is_word(
///         &self,
///         candidate: &str,
///         used: &HashSet<String>,
///     ) -> Result<bool, OracleError> {
///         if used.contains(candidate) {
///             return Ok(false);
///         }
///         self.client.lookup(candidate).await.map_err(|e| OracleError::Unavailable(e.to_string()))
///     }
/// }
/// ```
pub trait WordOracle: Send + Sync + 'static {
    fn is_word(
        &self,
        candidate: &str,
        used: &HashSet<String>,
    ) -> impl Future<Output = Result<bool, OracleError>> + Send;
}

impl<T: WordOracle> WordOracle for Arc<T> {
    fn is_word(
        &self,
        candidate: &str,
        used: &HashSet<String>,
    ) -> impl Future<Output = Result<bool, OracleError>> + Send {
        (**self).is_word(candidate, used)
    }
}

/// An in-memory word list. Lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from whitespace-separated words, skipping
    /// anything that is not purely ASCII letters.
    pub fn parse(text: &str) -> Self {
        text.split_whitespace().collect()
    }

    pub fn insert(&mut self, word: &str) -> bool {
        if word.is_empty() || !word.bytes().all(|b| b.is_ascii_alphabetic()) {
            return false;
        }
        self.words.insert(word.to_ascii_uppercase())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Dictionary {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut dictionary = Self::new();
        for word in iter {
            dictionary.insert(word);
        }
        dictionary
    }
}

impl WordOracle for Dictionary {
    fn is_word(
        &self,
        candidate: &str,
        used: &HashSet<String>,
    ) -> impl Future<Output = Result<bool, OracleError>> + Send {
        let upper = candidate.to_ascii_uppercase();
        ready(Ok(!used.contains(&upper) && self.words.contains(&upper)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> Dictionary {
        Dictionary::parse("testing\nghost  Stem\nnot-a-word 42")
    }

    #[test]
    fn test_parse_skips_non_letters() {
        let dict = dictionary();
        assert_eq!(dict.len(), 3);
        assert!(dict.contains("GHOST"));
        assert!(dict.contains("stem"));
        assert!(!dict.contains("42"));
    }

    #[tokio::test]
    async fn test_is_word_is_case_insensitive() {
        let dict = dictionary();
        let used = HashSet::new();
        assert!(dict.is_word("TESTING", &used).await.unwrap());
        assert!(dict.is_word("Ghost", &used).await.unwrap());
        assert!(!dict.is_word("GHOSTS", &used).await.unwrap());
    }

    #[tokio::test]
    async fn test_used_words_are_rejected() {
        let dict = dictionary();
        let used: HashSet<String> = ["GHOST".to_string()].into();
        assert!(!dict.is_word("GHOST", &used).await.unwrap());
        assert!(dict.is_word("STEM", &used).await.unwrap());
    }

    #[tokio::test]
    async fn test_arc_forwards() {
        let dict = Arc::new(dictionary());
        assert!(dict.is_word("STEM", &HashSet::new()).await.unwrap());
    }
}

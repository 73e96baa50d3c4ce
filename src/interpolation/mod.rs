//! Interpolation token handling
//!
//! Primary-language texts may embed interpolation tokens such as
//! `Hello {{name}}`. Tokens must survive machine translation byte for byte,
//! so before a text is sent to a provider every token is replaced with a
//! positional marker (`@0`, `@1`, ...) and the markers are swapped back in
//! the provider's answer afterwards.
//!
//! Delimiters are configurable; the compiled matcher is non-greedy, so
//! `{{a}} and {{b}}` yields two tokens, not one.

use regex::Regex;

use crate::config::InterpolationConfig;

/// Compiled interpolation delimiters for one engine
#[derive(Debug, Clone)]
pub struct InterpolationSpec {
    prefix: String,
    suffix: String,
    matcher: Regex,
}

impl InterpolationSpec {
    /// Build a spec from raw delimiter strings
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let suffix = suffix.into();
        let pattern = format!("{}.+?{}", regex::escape(&prefix), regex::escape(&suffix));
        // Escaped literals around a fixed core always form a valid pattern
        let matcher = Regex::new(&pattern).expect("Invalid interpolation pattern");

        Self {
            prefix,
            suffix,
            matcher,
        }
    }

    /// Build a spec from the engine configuration
    pub fn from_config(config: &InterpolationConfig) -> Self {
        Self::new(config.prefix.as_str(), config.suffix.as_str())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Extract interpolation tokens in order of appearance
    ///
    /// Matches are non-overlapping and include the delimiters, so the
    /// returned strings can be substituted back verbatim.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.matcher
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Replace each token with its positional marker `@i`
    ///
    /// Only the first remaining occurrence of a token is replaced per step,
    /// so duplicate tokens receive distinct markers in appearance order.
    pub fn mask(&self, text: &str, tokens: &[String]) -> String {
        let mut masked = text.to_string();
        for (i, token) in tokens.iter().enumerate() {
            masked = masked.replacen(token.as_str(), &marker(i), 1);
        }
        masked
    }

    /// Replace each positional marker with its original token
    ///
    /// A marker the provider dropped or mangled is simply not restored; the
    /// rest of the text is kept as the provider returned it.
    pub fn unmask(&self, translated: &str, tokens: &[String]) -> String {
        let mut restored = translated.to_string();
        for (i, token) in tokens.iter().enumerate() {
            restored = restored.replacen(&marker(i), token.as_str(), 1);
        }
        restored
    }
}

impl Default for InterpolationSpec {
    fn default() -> Self {
        Self::from_config(&InterpolationConfig::default())
    }
}

/// Positional marker for the i-th token
fn marker(index: usize) -> String {
    format!("@{index}")
}

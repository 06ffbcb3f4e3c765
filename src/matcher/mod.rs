//! Keyword classification of crawled pages
//!
//! A [`KeywordMatcher`] holds a precompiled, ordered table of rules. Literal
//! keyword rules are tested first against the page text, title and URL in that
//! order; structural pattern rules are the fallback and run over the
//! concatenation of all three. The first rule that hits decides the result.

mod keywords;
mod recheck;

pub use recheck::{recheck_matches, RecheckReport};

use crate::{ConfigError, ConfigResult};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Built-in keyword tables, one per target site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSet {
    /// English, Arabic and GCC technical terms
    Uae,
    /// English, French, Dutch and German terms
    Belgium,
}

impl KeywordSet {
    /// Literal keyword list in priority order
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Uae => keywords::UAE_KEYWORDS,
            Self::Belgium => keywords::BELGIUM_KEYWORDS,
        }
    }

    /// Structural fallback patterns in priority order
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Uae => keywords::UAE_PATTERNS,
            Self::Belgium => keywords::BELGIUM_PATTERNS,
        }
    }
}

/// Outcome of classifying one page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub is_match: bool,
    /// The literal keyword that hit, or the matched text of a fallback pattern
    pub keyword: Option<String>,
}

impl MatchResult {
    fn hit(keyword: String) -> Self {
        Self {
            is_match: true,
            keyword: Some(keyword),
        }
    }

    fn miss() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
enum Rule {
    /// Word-bounded literal, reported under its own spelling
    Literal { regex: Regex, keyword: String },
    /// Structural pattern, reported with the text it matched
    Pattern { regex: Regex },
}

/// Precompiled keyword/pattern table
#[derive(Debug)]
pub struct KeywordMatcher {
    rules: Vec<Rule>,
}

impl KeywordMatcher {
    /// Builds a matcher from literal keywords and regex patterns
    ///
    /// # Arguments
    ///
    /// * `keywords` - Literal phrases; regex metacharacters are escaped
    /// * `patterns` - Regular expressions, compiled case-insensitively
    ///
    /// # Returns
    ///
    /// * `Ok(KeywordMatcher)` - All rules compiled
    /// * `Err(ConfigError::InvalidPattern)` - A pattern failed to compile
    pub fn new<K, P>(keywords: K, patterns: P) -> ConfigResult<Self>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut rules = Vec::new();

        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            let regex = compile(&format!(r"\b{}\b", regex::escape(&keyword)))?;
            rules.push(Rule::Literal { regex, keyword });
        }

        for pattern in patterns {
            rules.push(Rule::Pattern {
                regex: compile(pattern.as_ref())?,
            });
        }

        Ok(Self { rules })
    }

    /// Builds a matcher from one of the built-in tables
    pub fn from_set(set: KeywordSet) -> ConfigResult<Self> {
        Self::new(set.keywords(), set.patterns())
    }

    /// Builds a site's matcher, letting configured lists replace the built-in ones
    pub fn for_site(
        set: KeywordSet,
        keywords: Option<&[String]>,
        patterns: Option<&[String]>,
    ) -> ConfigResult<Self> {
        let keywords: Vec<&str> = match keywords {
            Some(custom) => custom.iter().map(String::as_str).collect(),
            None => set.keywords().to_vec(),
        };
        let patterns: Vec<&str> = match patterns {
            Some(custom) => custom.iter().map(String::as_str).collect(),
            None => set.patterns().to_vec(),
        };
        Self::new(keywords, patterns)
    }

    /// Classifies a page from its extracted text, title and URL
    pub fn match_page(&self, text: &str, title: &str, url: &str) -> MatchResult {
        for rule in &self.rules {
            if let Rule::Literal { regex, keyword } = rule {
                if regex.is_match(text) || regex.is_match(title) || regex.is_match(url) {
                    return MatchResult::hit(keyword.clone());
                }
            }
        }

        let combined = format!("{} {} {}", text, title, url).to_lowercase();
        for rule in &self.rules {
            if let Rule::Pattern { regex } = rule {
                if let Some(found) = regex.find(&combined) {
                    return MatchResult::hit(found.as_str().to_string());
                }
            }
        }

        MatchResult::miss()
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile(pattern: &str) -> ConfigResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

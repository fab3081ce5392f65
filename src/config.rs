use crate::assemble::MAX_TWEET_CHARS;
use crate::filter::{ForbiddenPhrases, ParagraphFilter, TweetFilter};

/// Thresholds of the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of word tokens a tweet or paragraph needs.
    min_word_count: usize,
    /// Number of likes a tweet needs.
    min_likes: u64,
    /// Number of chars of a generated tweet.
    max_chars: usize,
    /// Patterns that disqualify a paragraph, `None` for the default set.
    forbidden_phrases: Option<Vec<String>>,
}

impl Config {
    /// Convenience method to create a [`ConfigBuilder`]
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn min_word_count(&self) -> usize {
        self.min_word_count
    }

    pub fn min_likes(&self) -> u64 {
        self.min_likes
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn tweet_filter(&self) -> TweetFilter {
        TweetFilter::new(self.min_word_count, self.min_likes)
    }

    pub fn paragraph_filter(&self) -> Result<ParagraphFilter, regex::Error> {
        let forbidden = match &self.forbidden_phrases {
            Some(phrases) => ForbiddenPhrases::new(phrases)?,
            None => ForbiddenPhrases::default(),
        };
        Ok(ParagraphFilter::new(self.min_word_count, forbidden))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    min_word_count: Option<usize>,
    min_likes: Option<u64>,
    max_chars: Option<usize>,
    forbidden_phrases: Option<Vec<String>>,
}

impl ConfigBuilder {
    pub fn min_word_count(mut self, min_word_count: usize) -> Self {
        self.min_word_count = Some(min_word_count);
        self
    }

    pub fn min_likes(mut self, min_likes: u64) -> Self {
        self.min_likes = Some(min_likes);
        self
    }

    /// Capped at 280 chars.
    pub fn max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn forbidden_phrases<I, T>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.forbidden_phrases = Some(phrases.into_iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn build(self) -> Config {
        Config {
            min_word_count: self.min_word_count.unwrap_or(10),
            min_likes: self.min_likes.unwrap_or(20),
            max_chars: self
                .max_chars
                .unwrap_or(MAX_TWEET_CHARS)
                .min(MAX_TWEET_CHARS),
            forbidden_phrases: self.forbidden_phrases,
        }
    }
}

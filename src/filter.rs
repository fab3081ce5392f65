use regex::Regex;

use crate::record::{CleanedTweet, ReplyTo};

/// Paragraphs starting with a link to another article.
pub const PHRASE_RELATED: &str = r"^RELATED: ";

/// Social media call-to-actions.
pub const PHRASE_FOLLOW: &str = r"follow (her|him|them) on (Instagram|Twitter|Snapchat|Tumblr)";

/// Source attributions.
pub const PHRASE_BRANDS: &str = r"Refinery29|PureWow";

/// Shopping call-to-actions.
pub const PHRASE_SHOP: &str = r"[sS]hop [tT]his|[bB]uy [tT]his";

/// Decides whether a text unit is kept.
pub trait Filter<T: ?Sized> {
    fn keep(&self, unit: &T) -> bool;
}

/// Number of whitespace delimited words.
#[inline]
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Whether `s` has less than `min_words` words.
#[inline]
pub fn is_short(s: &str, min_words: usize) -> bool {
    word_count(s) < min_words
}

/// Checks whether a tweet is a reply to someone else's tweet.
///
/// If a user is part of `reply_to` but was neither mentioned in the raw text
/// itself nor is the author, the tweet is considered a reply.
pub fn is_reply(s: &str, author: &str, reply_to: &[ReplyTo]) -> bool {
    let author = author.to_lowercase();
    reply_to
        .iter()
        .any(|u| !s.contains(u.username.as_str()) && u.username.to_lowercase() != author)
}

/// Case sensitive patterns that disqualify a paragraph.
#[derive(Debug, Clone)]
pub struct ForbiddenPhrases {
    re: Option<Regex>,
}

impl ForbiddenPhrases {
    pub fn new<I, T>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let patterns: Vec<_> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(ForbiddenPhrases::none());
        }
        Ok(Self {
            re: Some(Regex::new(&patterns.join("|"))?),
        })
    }

    /// No phrase is forbidden.
    pub fn none() -> Self {
        Self { re: None }
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.re.as_ref().map(|re| re.is_match(s)).unwrap_or_default()
    }
}

impl Default for ForbiddenPhrases {
    fn default() -> Self {
        Self {
            re: Some(
                Regex::new(&[PHRASE_RELATED, PHRASE_FOLLOW, PHRASE_BRANDS, PHRASE_SHOP].join("|"))
                    .unwrap(),
            ),
        }
    }
}

/// Exclusion criteria for cleaned article paragraphs.
#[derive(Debug, Clone)]
pub struct ParagraphFilter {
    /// Minimum number of words.
    pub min_words: usize,
    pub forbidden: ForbiddenPhrases,
}

impl ParagraphFilter {
    pub const DEFAULT_MIN_WORDS: usize = 10;

    pub fn new(min_words: usize, forbidden: ForbiddenPhrases) -> Self {
        Self {
            min_words,
            forbidden,
        }
    }
}

impl Default for ParagraphFilter {
    fn default() -> Self {
        ParagraphFilter::new(ParagraphFilter::DEFAULT_MIN_WORDS, Default::default())
    }
}

impl Filter<str> for ParagraphFilter {
    fn keep(&self, paragraph: &str) -> bool {
        !paragraph.is_empty()
            && !is_short(paragraph, self.min_words)
            && !self.forbidden.is_match(paragraph)
    }
}

/// Exclusion criteria for cleaned tweets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TweetFilter {
    /// Minimum number of words of the cleaned text.
    pub min_words: usize,
    /// Minimum number of likes.
    pub min_likes: u64,
}

impl TweetFilter {
    pub const DEFAULT_MIN_WORDS: usize = 10;

    pub const DEFAULT_MIN_LIKES: u64 = 20;

    pub fn new(min_words: usize, min_likes: u64) -> Self {
        Self {
            min_words,
            min_likes,
        }
    }
}

impl Default for TweetFilter {
    fn default() -> Self {
        TweetFilter::new(TweetFilter::DEFAULT_MIN_WORDS, TweetFilter::DEFAULT_MIN_LIKES)
    }
}

impl Filter<CleanedTweet> for TweetFilter {
    fn keep(&self, tweet: &CleanedTweet) -> bool {
        let record = &tweet.record;
        !is_short(&tweet.tweet_cleaned, self.min_words)
            && !is_reply(&record.tweet, &record.username, &record.reply_to)
            && record.likes_count >= self.min_likes
    }
}

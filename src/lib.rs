pub use assemble::{
    assemble_generated, clean_article_text, combine_lines, combine_tweets, dedup_stable,
    process_tweets,
};
pub use clean::{normalize, CleanPatterns, TextCleaner};
pub use config::{Config, ConfigBuilder};
pub use error::CurateError;
pub use filter::{is_reply, Filter, ForbiddenPhrases, ParagraphFilter, TweetFilter};
pub use record::{CleanedTweet, ReplyTo, TweetRecord};
pub use scrape::{Scraper, ScrapeConfig, SiteConfig, TagSpec};
pub use search::SearchConfig;
pub use sentence::trim_incomplete;

pub mod assemble;
pub mod clean;
mod config;
mod error;
pub mod filter;
pub mod publish;
pub mod record;
pub mod scrape;
pub mod search;
pub mod sentence;
pub mod table;

/// Rexported to implement custom predicates.
pub use select;

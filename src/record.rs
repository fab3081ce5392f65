use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use lazy_static::lazy_static;

lazy_static! {

    /// `username` values inside a serialized `reply_to` list, e.g.
    /// `[{'user_id': '123', 'username': 'bob'}]`.
    static ref RE_REPLY_TO_USERNAME: Regex = Regex::new(r#"['"]username['"]\s*:\s*['"]([^'"]*)['"]"#).unwrap();

}

/// A user a tweet was sent in reply to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    pub username: String,
}

impl ReplyTo {
    pub fn new<T: ToString>(username: T) -> Self {
        Self {
            username: username.to_string(),
        }
    }

    /// Extracts all users from the textual `reply_to` column.
    ///
    /// Malformed input results in an empty list.
    pub fn parse_list(s: &str) -> Vec<ReplyTo> {
        RE_REPLY_TO_USERNAME
            .captures_iter(s)
            .map(|cap| ReplyTo::new(&cap[1]))
            .collect()
    }

    /// Serializes a list the same way it is read.
    pub fn format_list(users: &[ReplyTo]) -> String {
        let users: Vec<_> = users
            .iter()
            .map(|u| format!("{{'username': '{}'}}", u.username))
            .collect();
        format!("[{}]", users.join(", "))
    }
}

fn deserialize_reply_to<'de, D>(deserializer: D) -> std::result::Result<Vec<ReplyTo>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(ReplyTo::parse_list(&s))
}

/// A single tweet as returned by the search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TweetRecord {
    /// Identifier assigned by the search.
    #[serde(default)]
    pub id: String,
    /// The raw tweet text.
    pub tweet: String,
    /// The author of the tweet.
    pub username: String,
    /// Users the tweet replies to.
    #[serde(default, deserialize_with = "deserialize_reply_to")]
    pub reply_to: Vec<ReplyTo>,
    #[serde(default)]
    pub likes_count: u64,
}

impl TweetRecord {
    pub fn new<T: ToString, U: ToString>(tweet: T, username: U) -> Self {
        Self {
            id: String::new(),
            tweet: tweet.to_string(),
            username: username.to_string(),
            reply_to: Vec::new(),
            likes_count: 0,
        }
    }

    pub fn id<T: ToString>(mut self, id: T) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn reply_to(mut self, reply_to: Vec<ReplyTo>) -> Self {
        self.reply_to = reply_to;
        self
    }

    pub fn likes_count(mut self, likes_count: u64) -> Self {
        self.likes_count = likes_count;
        self
    }
}

/// A [`TweetRecord`] and its cleaned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTweet {
    pub record: TweetRecord,
    pub tweet_cleaned: String,
}

#[derive(Serialize)]
struct CleanedTweetRow<'a> {
    id: &'a str,
    tweet: &'a str,
    username: &'a str,
    reply_to: String,
    likes_count: u64,
    tweet_cleaned: &'a str,
}

impl<'a> From<&'a CleanedTweet> for CleanedTweetRow<'a> {
    fn from(tweet: &'a CleanedTweet) -> Self {
        Self {
            id: &tweet.record.id,
            tweet: &tweet.record.tweet,
            username: &tweet.record.username,
            reply_to: ReplyTo::format_list(&tweet.record.reply_to),
            likes_count: tweet.record.likes_count,
            tweet_cleaned: &tweet.tweet_cleaned,
        }
    }
}

/// Reads tweets from csv with a header row.
///
/// Rows that can't be deserialized are skipped.
pub fn read_tweets<R: io::Read>(rdr: R) -> Result<Vec<TweetRecord>> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let mut tweets = Vec::new();
    for (idx, row) in rdr.deserialize::<TweetRecord>().enumerate() {
        match row {
            Ok(tweet) => tweets.push(tweet),
            Err(err) => warn!("Skipping malformed tweet row {}: {}", idx, err),
        }
    }
    Ok(tweets)
}

pub fn read_tweets_file<P: AsRef<Path>>(path: P) -> Result<Vec<TweetRecord>> {
    let path = path.as_ref();
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_tweets(file)
}

/// Writes the cleaned tweets as csv with a header row.
pub fn write_cleaned_tweets<W: io::Write>(wtr: W, tweets: &[CleanedTweet]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(wtr);
    for tweet in tweets {
        wtr.serialize(CleanedTweetRow::from(tweet))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_cleaned_tweets_file<P: AsRef<Path>>(path: P, tweets: &[CleanedTweet]) -> Result<()> {
    let path = path.as_ref();
    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_cleaned_tweets(file, tweets)
}

/// Reads a line delimited file, every line trimmed.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// Overwrites `path` with the lines.
pub fn write_lines<P: AsRef<Path>, T: AsRef<str>>(path: P, lines: &[T]) -> Result<()> {
    let path = path.as_ref();
    let content = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Appends the lines to `path`, each terminated by a newline.
pub fn append_lines<P: AsRef<Path>, T: AsRef<str>>(path: P, lines: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for line in lines {
        writeln!(file, "{}", line.as_ref())?;
    }
    Ok(())
}

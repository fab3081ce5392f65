use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A row of the `tweets(id, tweet, tweet_timestamp, tweet_url)` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetRow {
    pub id: usize,
    pub tweet: String,
    /// When the tweet was published, `None` if it wasn't yet.
    pub tweet_timestamp: Option<String>,
    pub tweet_url: Option<String>,
}

impl TweetRow {
    pub fn is_posted(&self) -> bool {
        self.tweet_timestamp.is_some()
    }
}

/// Numbers the tweets sequentially, starting at 0.
pub fn build_table<I, T>(tweets: I) -> Vec<TweetRow>
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    tweets
        .into_iter()
        .enumerate()
        .map(|(id, tweet)| TweetRow {
            id,
            tweet: tweet.to_string(),
            tweet_timestamp: None,
            tweet_url: None,
        })
        .collect()
}

/// Reads a table without a header row.
pub fn read_table<R: io::Read>(rdr: R) -> Result<Vec<TweetRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_reader(rdr);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Writes a table without a header row.
pub fn write_table<W: io::Write>(wtr: W, rows: &[TweetRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(wtr);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_table_file<P: AsRef<Path>>(path: P) -> Result<Vec<TweetRow>> {
    let path = path.as_ref();
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_table(file).with_context(|| format!("Malformed tweets table {}", path.display()))
}

pub fn write_table_file<P: AsRef<Path>>(path: P, rows: &[TweetRow]) -> Result<()> {
    let path = path.as_ref();
    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_table(file, rows)
}

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;

use crate::error::CurateError;
use crate::table::{read_table_file, write_table_file, TweetRow};

/// Format of `tweet_timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S+00";

/// Access to the table of tweets waiting to be published.
pub trait TweetStore {
    /// A random row that wasn't published yet.
    fn pick_unposted(&mut self) -> Result<Option<TweetRow>>;

    /// Records when and where the row was published.
    fn mark_posted(&mut self, id: usize, timestamp: &str, url: &str) -> Result<()>;
}

/// A [`TweetStore`] backed by a csv table file, rewritten on every update.
#[derive(Debug, Clone)]
pub struct CsvTweetStore {
    path: PathBuf,
    rows: Vec<TweetRow>,
}

impl CsvTweetStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = read_table_file(&path)?;
        Ok(Self { path, rows })
    }

    pub fn rows(&self) -> &[TweetRow] {
        &self.rows
    }
}

impl TweetStore for CsvTweetStore {
    fn pick_unposted(&mut self) -> Result<Option<TweetRow>> {
        let unposted: Vec<_> = self.rows.iter().filter(|row| !row.is_posted()).collect();
        Ok(unposted
            .choose(&mut rand::thread_rng())
            .map(|row| (*row).clone()))
    }

    fn mark_posted(&mut self, id: usize, timestamp: &str, url: &str) -> Result<()> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(CurateError::UnknownRow { id })?;
        row.tweet_timestamp = Some(timestamp.to_string());
        row.tweet_url = Some(url.to_string());
        write_table_file(&self.path, &self.rows)
    }
}

/// A published status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub id: String,
    /// Handle of the account that published it.
    pub screen_name: String,
}

impl Published {
    pub fn url(&self) -> String {
        format!(
            "https://twitter.com/{}/status/{}",
            self.screen_name, self.id
        )
    }
}

#[async_trait]
pub trait Publisher {
    async fn publish(&self, text: &str) -> Result<Published>;
}

/// OAuth 2.0 user context credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiData<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct User {
    username: String,
}

/// Publishes through the Twitter v2 API.
#[derive(Debug, Clone)]
pub struct TwitterPublisher {
    client: Client,
    api_url: String,
}

impl TwitterPublisher {
    pub const API_URL: &'static str = "https://api.twitter.com/2";

    pub fn new(credentials: &Credentials) -> Result<Self> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut auth: HeaderValue = format!("Bearer {}", credentials.access_token).parse()?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client: Client::builder().default_headers(headers).build()?,
            api_url: TwitterPublisher::API_URL.to_string(),
        })
    }

    pub fn api_url<T: ToString>(mut self, api_url: T) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    async fn checked(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(CurateError::Publish { status, body }.into())
        }
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn publish(&self, text: &str) -> Result<Published> {
        let resp = self
            .client
            .post(format!("{}/tweets", self.api_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        let tweet: ApiData<CreatedTweet> = TwitterPublisher::checked(resp).await?.json().await?;

        let resp = self
            .client
            .get(format!("{}/users/me", self.api_url))
            .send()
            .await?;
        let user: ApiData<User> = TwitterPublisher::checked(resp).await?.json().await?;

        Ok(Published {
            id: tweet.data.id,
            screen_name: user.data.username,
        })
    }
}

/// Everything needed to publish the next tweet.
#[derive(Debug, Clone)]
pub struct PostConfig {
    pub credentials: Credentials,
    /// The tweets table.
    pub table: PathBuf,
    /// Range of minutes to wait before publishing.
    pub delay_minutes: RangeInclusive<u64>,
}

impl PostConfig {
    pub fn new<P: AsRef<Path>>(credentials: Credentials, table: P) -> Self {
        Self {
            credentials,
            table: table.as_ref().to_path_buf(),
            delay_minutes: 1..=3,
        }
    }

    pub fn delay_minutes(mut self, delay_minutes: RangeInclusive<u64>) -> Self {
        self.delay_minutes = delay_minutes;
        self
    }

    /// A random delay within `delay_minutes`.
    pub fn random_delay(&self) -> Duration {
        if self.delay_minutes.is_empty() {
            return Duration::from_secs(0);
        }
        let minutes = rand::thread_rng().gen_range(self.delay_minutes.clone());
        Duration::from_secs(60 * minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The tweet was published to `url`.
    Published { id: usize, url: String },
    /// Every tweet of the table was published already.
    NothingLeft,
}

/// Publishes a random unpublished tweet after `delay` and records the result.
pub async fn post_next<S, P>(store: &mut S, publisher: &P, delay: Duration) -> Result<PostOutcome>
where
    S: TweetStore,
    P: Publisher + ?Sized,
{
    let row = match store.pick_unposted()? {
        Some(row) => row,
        None => {
            info!("No more Tweets left.");
            return Ok(PostOutcome::NothingLeft);
        }
    };

    debug!("Publishing tweet {} in {:?}", row.id, delay);
    tokio::time::sleep(delay).await;

    let published = publisher.publish(&row.tweet).await?;
    let url = published.url();
    store.mark_posted(row.id, &timestamp(Utc::now()), &url)?;

    info!("Tweet published to {}.", url);
    Ok(PostOutcome::Published { id: row.id, url })
}

/// Formats `time` as `tweet_timestamp`.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

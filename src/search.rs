use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CurateError;

const SINCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Configuration for a tweet search over a single account.
///
/// Every option the search understands is listed here, unknown options are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchConfig {
    #[serde(rename = "Lang")]
    pub lang: String,
    /// Only tweets after this date.
    #[serde(
        rename = "Since",
        serialize_with = "serialize_since",
        deserialize_with = "deserialize_since"
    )]
    pub since: NaiveDateTime,
    #[serde(rename = "Images")]
    pub images: bool,
    #[serde(rename = "Videos")]
    pub videos: bool,
    #[serde(rename = "Media")]
    pub media: bool,
    #[serde(rename = "Filter_retweets")]
    pub filter_retweets: bool,
    /// Max. number of tweets.
    #[serde(rename = "Limit")]
    pub limit: usize,
    #[serde(rename = "Store_csv")]
    pub store_csv: bool,
    #[serde(rename = "Hide_output")]
    pub hide_output: bool,
    /// Where the results are written to.
    #[serde(rename = "Output")]
    pub output: Option<PathBuf>,
    #[serde(rename = "Username")]
    pub username: Option<String>,
}

impl SearchConfig {
    /// All recognized option names.
    pub const OPTIONS: [&'static str; 11] = [
        "Lang",
        "Since",
        "Images",
        "Videos",
        "Media",
        "Filter_retweets",
        "Limit",
        "Store_csv",
        "Hide_output",
        "Output",
        "Username",
    ];

    pub const DEFAULT_LIMIT: usize = 10_000;

    /// The defaults with every `KEY=VALUE` pair applied.
    pub fn from_pairs<I, T>(pairs: I) -> Result<Self, CurateError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut config = SearchConfig::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let mut kv = pair.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some(key), Some(value)) => config.set(key.trim(), value.trim())?,
                _ => {
                    return Err(CurateError::MalformedPair {
                        pair: pair.to_string(),
                    })
                }
            }
        }
        Ok(config)
    }

    /// Sets a single option, the key is matched case insensitive.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CurateError> {
        let option = SearchConfig::OPTIONS
            .iter()
            .find(|opt| opt.eq_ignore_ascii_case(key))
            .ok_or_else(|| CurateError::UnknownSearchOption {
                key: key.to_string(),
            })?;

        let invalid = || CurateError::InvalidSearchOption {
            key: key.to_string(),
            value: value.to_string(),
        };

        match *option {
            "Lang" => self.lang = value.to_string(),
            "Since" => self.since = parse_since(value).ok_or_else(invalid)?,
            "Images" => self.images = parse_bool(value).ok_or_else(invalid)?,
            "Videos" => self.videos = parse_bool(value).ok_or_else(invalid)?,
            "Media" => self.media = parse_bool(value).ok_or_else(invalid)?,
            "Filter_retweets" => self.filter_retweets = parse_bool(value).ok_or_else(invalid)?,
            "Limit" => self.limit = usize::from_str(value).map_err(|_| invalid())?,
            "Store_csv" => self.store_csv = parse_bool(value).ok_or_else(invalid)?,
            "Hide_output" => self.hide_output = parse_bool(value).ok_or_else(invalid)?,
            "Output" => self.output = Some(PathBuf::from(value)),
            "Username" => self.username = Some(value.to_string()),
            _ => unreachable!("all options are handled"),
        }
        Ok(())
    }

    /// The config to search `account`, storing the results as
    /// `twitter_<account>.csv` in `data_dir`.
    pub fn for_account<P: AsRef<Path>>(&self, account: &str, data_dir: P) -> Self {
        let mut config = self.clone();
        config.username = Some(account.to_string());
        config.output = Some(data_dir.as_ref().join(format!("twitter_{}.csv", account)));
        config
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            since: NaiveDate::from_ymd(2018, 1, 1).and_hms(0, 0, 0),
            images: false,
            videos: false,
            media: false,
            filter_retweets: true,
            limit: SearchConfig::DEFAULT_LIMIT,
            store_csv: true,
            hide_output: true,
            output: None,
            username: None,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts `2018-01-01 0:0:0` as well as anything else `dtparse`
/// understands.
fn parse_since(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SINCE_FORMAT)
        .ok()
        .or_else(|| dtparse::parse(s).ok().map(|(date, _)| date))
}

fn serialize_since<S: Serializer>(since: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&since.format(SINCE_FORMAT).to_string())
}

fn deserialize_since<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_since(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date `{}`", s)))
}

/// Reads the accounts to search, one per line.
pub fn read_accounts<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    Ok(crate::record::read_lines(path)?
        .into_iter()
        .filter(|account| !account.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.lang, "en");
        assert_eq!(config.since, NaiveDate::from_ymd(2018, 1, 1).and_hms(0, 0, 0));
        assert!(config.filter_retweets);
        assert!(!config.media);
        assert_eq!(config.limit, 10_000);
        assert!(config.output.is_none());
    }

    #[test]
    fn overrides() {
        let config =
            SearchConfig::from_pairs(vec!["limit=50", "Since=2020-03-01 0:0:0", "Images=True"])
                .unwrap();
        assert_eq!(config.limit, 50);
        assert_eq!(config.since, NaiveDate::from_ymd(2020, 3, 1).and_hms(0, 0, 0));
        assert!(config.images);
    }

    #[test]
    fn rejects_unknown_and_invalid() {
        match SearchConfig::from_pairs(vec!["Retweets=True"]) {
            Err(CurateError::UnknownSearchOption { key }) => assert_eq!(key, "Retweets"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            SearchConfig::from_pairs(vec!["Limit=many"]),
            Err(CurateError::InvalidSearchOption { .. })
        ));
        assert!(matches!(
            SearchConfig::from_pairs(vec!["Images"]),
            Err(CurateError::MalformedPair { .. })
        ));
    }

    #[test]
    fn per_account() {
        let config = SearchConfig::default().for_account("astro", "data/raw");
        assert_eq!(config.username.as_deref(), Some("astro"));
        assert_eq!(config.output, Some(PathBuf::from("data/raw/twitter_astro.csv")));
    }

    #[test]
    fn json() {
        let config = SearchConfig::default().for_account("astro", "raw");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["Since"], "2018-01-01 00:00:00");
        assert_eq!(json["Username"], "astro");
        let back: SearchConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);

        assert!(serde_json::from_str::<SearchConfig>(r#"{"Unknown": 1}"#).is_err());
        let partial: SearchConfig = serde_json::from_str(r#"{"Limit": 5}"#).unwrap();
        assert_eq!(partial.limit, 5);
    }
}

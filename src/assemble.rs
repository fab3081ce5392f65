use std::hash::Hash;

use fnv::FnvHashSet;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::clean::TextCleaner;
use crate::filter::{Filter, ParagraphFilter, TweetFilter};
use crate::record::{CleanedTweet, TweetRecord};
use crate::sentence::trim_incomplete;

/// Hard limit for the length of a tweet.
pub const MAX_TWEET_CHARS: usize = 280;

/// Removes later duplicates, preserving the position of each first
/// occurrence.
pub fn dedup_stable<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = FnvHashSet::default();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// Cleans a batch of tweets and returns the subset that passes the filter,
/// deduplicated by the cleaned text.
pub fn process_tweets(
    records: Vec<TweetRecord>,
    cleaner: &TextCleaner,
    filter: &TweetFilter,
) -> Vec<CleanedTweet> {
    let total = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .map(|record| CleanedTweet {
            tweet_cleaned: cleaner.clean(&record.tweet),
            record,
        })
        .filter(|tweet| {
            let keep = filter.keep(tweet);
            if !keep {
                debug!("Dropping tweet {:?}", tweet.record.id);
            }
            keep
        })
        .collect();

    let tweets = dedup_stable(kept, |t| t.tweet_cleaned.clone());
    info!("Kept {} of {} tweets", tweets.len(), total);
    tweets
}

/// Concatenates the batches and removes duplicates across all of them.
pub fn combine_tweets<I>(batches: I) -> Vec<CleanedTweet>
where
    I: IntoIterator<Item = Vec<CleanedTweet>>,
{
    let all = batches.into_iter().flatten().collect();
    dedup_stable(all, |t: &CleanedTweet| t.tweet_cleaned.clone())
}

/// Cleans text chunks and keeps those that pass the filter.
pub fn clean_article_text<I, T>(
    chunks: I,
    cleaner: &TextCleaner,
    filter: &ParagraphFilter,
) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    chunks
        .into_iter()
        .map(|chunk| cleaner.clean(chunk.as_ref()))
        .filter(|paragraph| filter.keep(paragraph.as_str()))
        .collect()
}

/// Concatenates line collections, optionally removing duplicates across
/// all of them.
pub fn combine_lines<I>(batches: I, dedup: bool) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let all: Vec<String> = batches.into_iter().flatten().collect();
    if dedup {
        dedup_stable(all, String::clone)
    } else {
        all
    }
}

/// Removes incomplete sentences from generated lines, drops those longer
/// than `max_chars` (never more than [`MAX_TWEET_CHARS`]) and shuffles the
/// rest.
pub fn assemble_generated<I, T, R>(lines: I, max_chars: usize, rng: &mut R) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
    R: Rng + ?Sized,
{
    let max_chars = max_chars.min(MAX_TWEET_CHARS);
    let mut tweets: Vec<_> = lines
        .into_iter()
        .map(|line| trim_incomplete(line.as_ref()))
        .filter(|tweet| !tweet.is_empty() && tweet.chars().count() <= max_chars)
        .collect();
    tweets.shuffle(rng);
    tweets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ForbiddenPhrases;
    use crate::record::ReplyTo;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const LONG: &str = "the stars align for every sign this week so be ready";

    fn tweet(id: u32, text: &str) -> TweetRecord {
        TweetRecord::new(text, "alice").id(id).likes_count(50)
    }

    #[test]
    fn stable_dedup() {
        let items = vec!["a", "a", "b"];
        let out = dedup_stable(items.into_iter().enumerate().collect(), |(_, s)| *s);
        assert_eq!(out, vec![(0, "a"), (2, "b")]);
    }

    #[test]
    fn dedups_on_cleaned_text() {
        let records = vec![
            tweet(1, &format!("{} https://t.co/1", LONG)),
            tweet(2, &format!("{} #astro", LONG)),
            tweet(3, &format!("{} again", LONG)),
        ];
        let out = process_tweets(records, &TextCleaner::tweet(), &TweetFilter::default());
        let ids: Vec<_> = out.iter().map(|t| t.record.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(out[0].tweet_cleaned, LONG);
        assert_eq!(out[0].record.tweet, format!("{} https://t.co/1", LONG));
    }

    #[test]
    fn filters_tweets() {
        let records = vec![
            tweet(1, LONG).likes_count(3),
            tweet(2, "too short"),
            tweet(3, LONG).reply_to(vec![ReplyTo::new("carol")]),
            tweet(4, &format!("{} @bob", LONG)).reply_to(vec![ReplyTo::new("bob")]),
        ];
        let out = process_tweets(records, &TextCleaner::tweet(), &TweetFilter::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.id, "4");
    }

    #[test]
    fn combines_batches() {
        let cleaner = TextCleaner::tweet();
        let filter = TweetFilter::default();
        let first = process_tweets(vec![tweet(1, LONG)], &cleaner, &filter);
        let second = process_tweets(
            vec![tweet(2, &format!("{} @x", LONG)), tweet(3, &format!("{} too", LONG))],
            &cleaner,
            &filter,
        );
        let all = combine_tweets(vec![first, second]);
        let ids: Vec<_> = all.iter().map(|t| t.record.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn cleans_articles() {
        let chunks = vec![
            "",
            "RELATED: these are ten words long but they are not kept",
            "  Your horoscope\tfor the week ahead, written by @astro just for you ",
            "short",
        ];
        let out = clean_article_text(chunks, &TextCleaner::article(), &ParagraphFilter::default());
        assert_eq!(out, vec!["Your horoscope for the week ahead, written by just for you"]);

        let lenient = ParagraphFilter::new(1, ForbiddenPhrases::none());
        let out = clean_article_text(vec!["RELATED: x", "short"], &TextCleaner::article(), &lenient);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn combines_lines() {
        let batches = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["a".to_string(), "c".to_string()],
        ];
        assert_eq!(combine_lines(batches.clone(), false).len(), 4);
        assert_eq!(combine_lines(batches, true), vec!["a", "b", "c"]);
    }

    #[test]
    fn generated_char_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        let exact = "a".repeat(280);
        let over = "b".repeat(281);
        let out = assemble_generated(vec![exact.clone(), over], 280, &mut rng);
        assert_eq!(out, vec![exact.clone()]);

        // requested caps above the limit are clamped
        let out = assemble_generated(vec!["c".repeat(281)], 500, &mut rng);
        assert!(out.is_empty());

        let out = assemble_generated(vec![exact], 100, &mut rng);
        assert!(out.is_empty());
    }

    #[test]
    fn generated_is_trimmed_and_shuffled() {
        let mut rng = StdRng::seed_from_u64(1);
        let lines: Vec<String> = (0..20).map(|i| format!("Line {}. Cut off", i)).collect();
        let mut out = assemble_generated(lines, 280, &mut rng);
        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|l| !l.contains("Cut off")));
        out.sort();
        let mut expected: Vec<_> = (0..20).map(|i| format!("Line {}.", i)).collect();
        expected.sort();
        assert_eq!(out, expected);
    }
}

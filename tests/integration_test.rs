use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use astroblatt::publish::{post_next, CsvTweetStore, PostOutcome, Published, Publisher};
use astroblatt::record::{read_lines, read_tweets_file, write_cleaned_tweets_file, write_lines};
use astroblatt::table::{build_table, read_table_file, write_table_file};
use astroblatt::{
    assemble_generated, clean_article_text, combine_tweets, process_tweets, Config, TextCleaner,
};

const HEADER: &str = "id,conversation_id,date,tweet,username,reply_to,likes_count\n";

#[test]
fn tweets_from_multiple_accounts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = dir.path().join("twitter_moonchild.csv");
    let second = dir.path().join("twitter_starsign.csv");

    std::fs::write(
        &first,
        format!(
            "{}{}{}{}",
            HEADER,
            "1,1,2020-01-01,Full moon in Cancer asks you to slow down and feel everything deeply https://t.co/x,moonchild,[],120\n",
            "2,2,2020-01-02,@starsign exactly what I needed to hear about the full moon today honestly,moonchild,\"[{'user_id': '9', 'username': 'starsign'}]\",40\n",
            "3,3,2020-01-03,lol,moonchild,[],500\n",
        ),
    )?;
    std::fs::write(
        &second,
        format!(
            "{}{}{}",
            HEADER,
            "4,4,2020-01-04,Full moon in Cancer asks you to slow down and feel everything deeply #fullmoon,starsign,[],80\n",
            "5,5,2020-01-05,Venus enters Taurus and your love life gets a lot more grounded this month,starsign,\"[{'user_id': '7', 'username': 'someone'}]\",90\n",
        ),
    )?;

    let config = Config::default();
    let cleaner = TextCleaner::tweet();
    let filter = config.tweet_filter();

    let mut batches = Vec::new();
    for file in &[&first, &second] {
        let tweets = process_tweets(read_tweets_file(file)?, &cleaner, &filter);
        let processed = dir.path().join("processed.csv");
        write_cleaned_tweets_file(&processed, &tweets)?;
        batches.push(tweets);
    }
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[1].len(), 1);

    let combined = combine_tweets(batches);
    let ids: Vec<_> = combined.iter().map(|t| t.record.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(
        combined[1].tweet_cleaned,
        "exactly what I needed to hear about the full moon today honestly"
    );

    let out = dir.path().join("tweet_data.txt");
    let lines: Vec<_> = combined.iter().map(|t| t.tweet_cleaned.as_str()).collect();
    write_lines(&out, &lines)?;
    assert_eq!(read_lines(&out)?.len(), 2);
    Ok(())
}

#[test]
fn article_paragraphs() -> Result<()> {
    let config = Config::builder().min_word_count(5).build();
    let raw = vec![
        "RELATED: Your Horoscope For This Week",
        "This week the sun moves into your sign, bringing energy\u{a0}and focus.",
        "Shop this crystal set for the new moon",
        "Too short.",
        "",
    ];
    let cleaned = clean_article_text(raw, &TextCleaner::article(), &config.paragraph_filter()?);
    assert_eq!(
        cleaned,
        vec!["This week the sun moves into your sign, bringing energyand focus."]
    );
    Ok(())
}

struct FixedPublisher;

#[async_trait]
impl Publisher for FixedPublisher {
    async fn publish(&self, _text: &str) -> Result<Published> {
        Ok(Published {
            id: "42".to_string(),
            screen_name: "astrobot".to_string(),
        })
    }
}

#[tokio::test]
async fn generated_to_published() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let generated = vec![
        "Trust your intuition today. The stars are".to_string(),
        "x".repeat(281),
        "Rest is productive too, Virgo.".to_string(),
    ];

    let mut rng = StdRng::seed_from_u64(3);
    let mut tweets = assemble_generated(generated, 280, &mut rng);
    tweets.sort();
    assert_eq!(
        tweets,
        vec!["Rest is productive too, Virgo.", "Trust your intuition today."]
    );

    let table = dir.path().join("tweets.csv");
    write_table_file(&table, &build_table(&tweets))?;

    let mut store = CsvTweetStore::open(&table)?;
    for _ in 0..tweets.len() {
        let outcome = post_next(&mut store, &FixedPublisher, Duration::from_millis(0)).await?;
        assert!(matches!(outcome, PostOutcome::Published { .. }));
    }
    let outcome = post_next(&mut store, &FixedPublisher, Duration::from_millis(0)).await?;
    assert_eq!(outcome, PostOutcome::NothingLeft);

    let rows = read_table_file(&table)?;
    assert!(rows.iter().all(|row| row.is_posted()));
    assert!(rows
        .iter()
        .all(|row| row.tweet_url.as_deref() == Some("https://twitter.com/astrobot/status/42")));
    Ok(())
}

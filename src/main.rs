use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use structopt::StructOpt;

use astroblatt::publish::{post_next, Credentials, CsvTweetStore, PostConfig, PostOutcome, TwitterPublisher};
use astroblatt::record::{
    append_lines, read_lines, read_tweets_file, write_cleaned_tweets_file, write_lines,
};
use astroblatt::scrape::{read_site_configs, scrape_sites};
use astroblatt::search::read_accounts;
use astroblatt::table::{build_table, write_table_file};
use astroblatt::{
    assemble_generated, clean_article_text, combine_lines, combine_tweets, process_tweets, Config,
    ScrapeConfig, Scraper, SearchConfig, SiteConfig, TextCleaner,
};

#[allow(missing_docs)]
#[derive(Debug, StructOpt)]
#[structopt(name = "astroblatt", about = "Tweet and article scraping and curation.")]
enum App {
    #[structopt(name = "search", about = "Print the tweet search config for every account.")]
    Search {
        #[structopt(
            long = "accounts-list",
            help = "Text file containing the accounts to search, one per line.",
            parse(from_os_str),
            default_value = "twitter_accounts.txt"
        )]
        accounts_list: PathBuf,
        #[structopt(
            long = "data-dir",
            help = "Directory for saving tweet data.",
            parse(from_os_str),
            default_value = "data/raw"
        )]
        data_dir: PathBuf,
        #[structopt(
            long = "config-params",
            help = "Search options as KEY=VALUE pairs."
        )]
        config_params: Vec<String>,
    },
    #[structopt(name = "tweets", about = "Clean up searched tweets.")]
    Tweets {
        #[structopt(flatten)]
        dirs: Dirs,
        #[structopt(flatten)]
        opts: Opts,
    },
    #[structopt(name = "scrape", about = "Scrape website articles.")]
    Scrape {
        #[structopt(
            long = "config-filepath",
            help = "JSON file containing the configs of the websites to scrape.",
            parse(from_os_str),
            default_value = "article_site_configs.json"
        )]
        config_filepath: PathBuf,
        #[structopt(
            long = "raw-data-dir",
            help = "Directory for saving raw scraped text.",
            parse(from_os_str),
            default_value = "data/raw"
        )]
        raw_data_dir: PathBuf,
        #[structopt(long = "max-articles", help = "Max. number of articles per site.")]
        max_articles: Option<usize>,
        #[structopt(
            long = "retry-delay",
            help = "Seconds to wait before retrying a rate limited request."
        )]
        retry_delay: Option<u64>,
        #[structopt(long = "user-agent", help = "The user-agent used for requests.")]
        user_agent: Option<String>,
    },
    #[structopt(name = "articles", about = "Clean articles text.")]
    Articles {
        #[structopt(flatten)]
        dirs: Dirs,
        #[structopt(flatten)]
        opts: Opts,
        #[structopt(long = "dedup", help = "Remove duplicate paragraphs across all sites.")]
        dedup: bool,
    },
    #[structopt(name = "generated", about = "Clean generated tweets.")]
    Generated {
        #[structopt(
            long = "input-file-path",
            parse(from_os_str),
            default_value = "output/bot_tweets_raw.txt"
        )]
        input_file_path: PathBuf,
        #[structopt(
            long = "output-file-path",
            parse(from_os_str),
            default_value = "output/bot_tweets_cleaned.txt"
        )]
        output_file_path: PathBuf,
        #[structopt(
            long = "max-char-length",
            help = "Maximum character count for each tweet. Max allowable is 280.",
            default_value = "280"
        )]
        max_char_length: usize,
    },
    #[structopt(name = "table", about = "Create the table containing the final list of tweets.")]
    Table {
        #[structopt(
            long = "input-file-path",
            parse(from_os_str),
            default_value = "output/bot_tweets_cleaned.txt"
        )]
        input_file_path: PathBuf,
        #[structopt(
            long = "output-file-path",
            parse(from_os_str),
            default_value = "output/tweets.csv"
        )]
        output_file_path: PathBuf,
    },
    #[structopt(
        name = "post",
        about = "Publish a random unpublished tweet. Reads ACCESS_TOKEN from the environment."
    )]
    Post {
        #[structopt(long = "table", parse(from_os_str), default_value = "output/tweets.csv")]
        table: PathBuf,
        #[structopt(long = "no-delay", help = "Publish without the random 1-3 minute delay.")]
        no_delay: bool,
    },
}

#[derive(Debug, Clone, StructOpt)]
pub struct Dirs {
    #[structopt(
        long = "raw-data-dir",
        help = "Directory of the raw scraped text.",
        parse(from_os_str),
        default_value = "data/raw"
    )]
    raw_data_dir: PathBuf,
    #[structopt(
        long = "processed-data-dir",
        help = "Directory for saving processed text per source.",
        parse(from_os_str),
        default_value = "data/processed"
    )]
    processed_data_dir: PathBuf,
    #[structopt(
        long = "output-data-dir",
        help = "Directory for saving the combined cleaned data file.",
        parse(from_os_str),
        default_value = "data/final"
    )]
    output_data_dir: PathBuf,
}

impl Dirs {
    fn create(&self) -> Result<()> {
        for dir in &[&self.processed_data_dir, &self.output_data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, StructOpt)]
pub struct Opts {
    #[structopt(long = "min-words", help = "Number of words a text needs to be kept.")]
    min_word_count: Option<usize>,
    #[structopt(long = "min-likes", help = "Number of likes a tweet needs to be kept.")]
    min_likes: Option<u64>,
}

impl Opts {
    fn as_config(&self) -> Config {
        let mut config = Config::builder();
        if let Some(min_word_count) = self.min_word_count {
            config = config.min_word_count(min_word_count);
        }
        if let Some(min_likes) = self.min_likes {
            config = config.min_likes(min_likes);
        }
        config.build()
    }
}

/// Files in `dir` named `<prefix>*.<ext>`, sorted by name.
fn source_files(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(prefix))
            .unwrap_or_default()
            && path.extension().and_then(|e| e.to_str()) == Some(ext);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Appends the text of every article of `site` to `articles_<name>.txt`.
async fn scrape_site(
    scraper: &Scraper,
    raw_data_dir: &Path,
    name: String,
    site: SiteConfig,
) -> Result<()> {
    let patterns = site
        .patterns()
        .with_context(|| format!("Invalid patterns for site {}", name))?;
    let raw_file = raw_data_dir.join(format!("articles_{}.txt", name));
    info!("Scraping {}", name);
    for link in scraper.site_links(&site, &patterns).await? {
        let raw_text = scraper.site_article_text(&site, &patterns, &link).await?;
        append_lines(&raw_file, &raw_text)?;
    }
    Ok(())
}

impl App {
    async fn run(self) -> Result<()> {
        match self {
            App::Search {
                accounts_list,
                data_dir,
                config_params,
            } => {
                let config = SearchConfig::from_pairs(&config_params)?;
                for account in read_accounts(&accounts_list)? {
                    let config = config.for_account(&account, &data_dir);
                    println!("{}", serde_json::to_string(&config)?);
                }
            }
            App::Tweets { dirs, opts } => {
                dirs.create()?;
                let cleaner = TextCleaner::tweet();
                let filter = opts.as_config().tweet_filter();

                let mut batches = Vec::new();
                for raw_file in source_files(&dirs.raw_data_dir, "twitter_", "csv")? {
                    let tweets = process_tweets(read_tweets_file(&raw_file)?, &cleaner, &filter);
                    let processed = dirs
                        .processed_data_dir
                        .join(format!("{}_cleaned.csv", stem(&raw_file)));
                    write_cleaned_tweets_file(&processed, &tweets)?;
                    info!("Cleaned {} into {}", raw_file.display(), processed.display());
                    batches.push(tweets);
                }

                let tweets = combine_tweets(batches);
                let lines: Vec<_> = tweets.iter().map(|t| t.tweet_cleaned.as_str()).collect();
                write_lines(dirs.output_data_dir.join("tweet_data.txt"), &lines)?;
                info!("Saved {} tweets", lines.len());
            }
            App::Scrape {
                config_filepath,
                raw_data_dir,
                max_articles,
                retry_delay,
                user_agent,
            } => {
                fs::create_dir_all(&raw_data_dir)?;
                let mut config = ScrapeConfig::builder();
                if let Some(max_articles) = max_articles {
                    config = config.max_articles(max_articles);
                }
                if let Some(retry_delay) = retry_delay {
                    config = config.rate_limit_delay(Duration::from_secs(retry_delay));
                }
                if let Some(user_agent) = user_agent {
                    config = config.browser_user_agent(user_agent);
                }
                let scraper = Scraper::new(config.build())?;

                let sites = read_site_configs(&config_filepath)?;
                let total = sites.len();
                let failed = scrape_sites(sites, |name, site| {
                    scrape_site(&scraper, &raw_data_dir, name, site)
                })
                .await;
                info!("Scraped {} of {} sites", total - failed.len(), total);
            }
            App::Articles { dirs, opts, dedup } => {
                dirs.create()?;
                let cleaner = TextCleaner::article();
                let filter = opts.as_config().paragraph_filter()?;

                let mut batches = Vec::new();
                for raw_file in source_files(&dirs.raw_data_dir, "articles_", "txt")? {
                    let cleaned = clean_article_text(read_lines(&raw_file)?, &cleaner, &filter);
                    let processed = dirs
                        .processed_data_dir
                        .join(format!("{}_cleaned.txt", stem(&raw_file)));
                    append_lines(&processed, &cleaned)?;
                    batches.push(cleaned);
                }

                let articles = combine_lines(batches, dedup);
                write_lines(dirs.output_data_dir.join("article_data.txt"), &articles)?;
                info!("Saved {} paragraphs", articles.len());
            }
            App::Generated {
                input_file_path,
                output_file_path,
                max_char_length,
            } => {
                let tweets = assemble_generated(
                    read_lines(&input_file_path)?,
                    max_char_length,
                    &mut rand::thread_rng(),
                );
                write_lines(&output_file_path, &tweets)?;
                info!("Saved {} generated tweets", tweets.len());
            }
            App::Table {
                input_file_path,
                output_file_path,
            } => {
                let rows = build_table(read_lines(&input_file_path)?);
                write_table_file(&output_file_path, &rows)?;
            }
            App::Post { table, no_delay } => {
                let credentials = Credentials {
                    access_token: std::env::var("ACCESS_TOKEN")
                        .context("ACCESS_TOKEN must be set")?,
                };
                let mut config = PostConfig::new(credentials, table);
                if no_delay {
                    config = config.delay_minutes(0..=0);
                }

                let publisher = TwitterPublisher::new(&config.credentials)?;
                let mut store = CsvTweetStore::open(&config.table)?;
                match post_next(&mut store, &publisher, config.random_delay()).await? {
                    PostOutcome::Published { url, .. } => {
                        println!("{}", serde_json::json!({ "text": format!("Tweet published to {}.", url) }))
                    }
                    PostOutcome::NothingLeft => {
                        println!("{}", serde_json::json!({ "text": "No more Tweets left." }))
                    }
                }
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    App::from_args().run().await
}

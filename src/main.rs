use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use shelfwise::catalog::{
    build_client, GoogleBooks, ItunesDirectory, OpenLibrary, PodcastDirectory, SoundCloudOEmbed,
};
use shelfwise::classify::{ClassificationInput, FacetClassifier, Taxonomy};
use shelfwise::config::Config;
use shelfwise::feed::{ConformantFeedParser, FeedSource, PodcastImporter};
use shelfwise::reconcile::{BookReconciler, BookRequest, FetchStrategy, RawSourceRecord, SourceTier};
use std::path::PathBuf;

/// Get the config file path (~/.config/shelfwise/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("shelfwise")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "shelfwise",
    about = "Look up books and podcasts and normalize their metadata"
)]
struct Args {
    /// Config file (defaults to ~/.config/shelfwise/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile a book by ISBN or free text
    Book {
        /// ISBN-10, ISBN-13 (any separators) or search text
        query: String,

        /// Query both catalogs at once
        #[arg(long)]
        concurrent: bool,

        /// Title that overrides every catalog
        #[arg(long)]
        title: Option<String>,

        /// Author that overrides every catalog (repeatable)
        #[arg(long = "author")]
        authors: Vec<String>,
    },
    /// Import a podcast feed
    Podcast {
        #[command(flatten)]
        source: PodcastSource,

        /// Parse with the feed-rs backed parser
        #[arg(long)]
        strict: bool,
    },
    /// Search the podcast directory
    SearchPodcasts { term: String },
    /// Classify a book from its metadata
    Classify {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Author name (repeatable)
        #[arg(long = "author")]
        authors: Vec<String>,

        /// Publication date, any format with a four-digit year
        #[arg(long)]
        published: Option<String>,

        #[arg(long)]
        pages: Option<u32>,
    },
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct PodcastSource {
    /// Direct RSS feed URL
    #[arg(long, value_name = "URL")]
    feed: Option<String>,

    /// Apple Podcasts show page URL
    #[arg(long, value_name = "URL")]
    apple: Option<String>,

    /// SoundCloud user or playlist page URL
    #[arg(long, value_name = "URL")]
    soundcloud: Option<String>,
}

impl From<PodcastSource> for FeedSource {
    fn from(source: PodcastSource) -> Self {
        FeedSource {
            feed_url: source.feed,
            apple_show_url: source.apple,
            soundcloud_url: source.soundcloud,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Env var takes precedence over the config file
    if let Ok(key) = std::env::var("GOOGLE_BOOKS_API_KEY") {
        if !key.trim().is_empty() {
            config.google_books_api_key = Some(key);
        }
    }
    tracing::debug!(?config, "Effective configuration");

    let client = build_client().context("Failed to build HTTP client")?;
    let timeout = config.timeout();

    match args.command {
        Command::Book {
            query,
            concurrent,
            title,
            authors,
        } => {
            let strategy = if concurrent {
                FetchStrategy::Concurrent
            } else {
                config.fetch_strategy
            };
            let primary = GoogleBooks::new(
                client.clone(),
                &config.primary_base_url,
                config.google_books_api_key.clone(),
                timeout,
            );
            let secondary = OpenLibrary::new(
                client,
                &config.secondary_base_url,
                &config.covers_base_url,
                timeout,
            );
            let reconciler = BookReconciler::new(primary, secondary, &config.covers_base_url)
                .with_strategy(strategy);

            let mut request = BookRequest::new(query);
            if title.is_some() || !authors.is_empty() {
                let mut manual = RawSourceRecord::new(SourceTier::Manual);
                manual.title = title;
                manual.authors = authors;
                request = request.with_manual(manual);
            }

            let book = reconciler.lookup(&request).await;
            print_json(&book)
        }
        Command::Podcast { source, strict } => {
            let importer = PodcastImporter::new(
                client.clone(),
                ItunesDirectory::new(client.clone(), &config.directory_base_url, timeout),
                SoundCloudOEmbed::new(client, &config.oembed_url, timeout),
                timeout,
            );
            let source = FeedSource::from(source);
            let feed = if strict {
                importer
                    .with_parser(ConformantFeedParser)
                    .import(&source)
                    .await
            } else {
                importer.import(&source).await
            }
            .context("Failed to import podcast")?;
            print_json(&feed)
        }
        Command::SearchPodcasts { term } => {
            let directory = ItunesDirectory::new(client, &config.directory_base_url, timeout);
            let results = directory
                .search(&term)
                .await
                .context("Podcast directory search failed")?;
            print_json(&results)
        }
        Command::Classify {
            title,
            description,
            authors,
            published,
            pages,
        } => {
            let taxonomy = match &config.taxonomy_path {
                Some(path) => Taxonomy::from_file(path)
                    .with_context(|| format!("Failed to load taxonomy from {}", path.display()))?,
                None => Taxonomy::builtin().context("Built-in taxonomy is invalid")?,
            };
            let input = ClassificationInput {
                title,
                description,
                authors,
                published_date: published,
                page_count: pages,
            };
            input.validate().context("Invalid classification input")?;

            let labels = FacetClassifier::new(taxonomy).classify(&input);
            print_json(&labels)
        }
    }
}

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use cord_core::ingest::{load_rows, load_text_tokens};
use cord_core::text::{format_date, shorten};
use cord_core::{parse_date, Corpus, CorpusSummary, SearchConfig, SearchOptions, Tag, TextField};
use std::path::PathBuf;
use time::Date;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cord")]
#[command(about = "Search and explore a corpus of research papers", long_about = None)]
struct Cli {
    /// JSON file with search settings (overrides CORD_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Metadata path: a .json or .jsonl file, or a directory of them
    #[arg(long)]
    input: PathBuf,
    /// Directory of full-text JSON papers; index their text instead of abstracts
    #[arg(long)]
    texts: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show paper and tag counts
    Summary {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Rank papers against a free-text query
    Search {
        #[command(flatten)]
        corpus: CorpusArgs,
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Only COVID-19 related papers
        #[arg(long, default_value_t = false)]
        covid: bool,
        /// Published on or after (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        start: Option<Date>,
        /// Published before (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        end: Option<Date>,
    },
    /// List papers in a filtered view of the corpus
    List {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// covid_related, virus, coronavirus or sars
        #[arg(long)]
        tag: Option<Tag>,
        #[arg(long, value_parser = date_arg)]
        after: Option<Date>,
        #[arg(long, value_parser = date_arg)]
        before: Option<Date>,
        /// Keep papers with unknown dates when filtering by date
        #[arg(long, default_value_t = false)]
        include_unknown: bool,
        /// Substring the field must contain
        #[arg(long)]
        contains: Option<String>,
        /// Regex the field must match from its start
        #[arg(long)]
        matches: Option<String>,
        #[arg(long, default_value = "abstract")]
        field: TextField,
        #[arg(long, conflicts_with_all = ["tail", "sample"])]
        head: Option<usize>,
        #[arg(long, conflicts_with = "sample")]
        tail: Option<usize>,
        #[arg(long)]
        sample: Option<usize>,
    },
}

fn date_arg(s: &str) -> Result<Date, String> {
    parse_date(s).ok_or_else(|| format!("not a date: {s}"))
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::from_env(),
    };

    match cli.command {
        Commands::Summary { corpus } => {
            let corpus = load_corpus(&corpus, &config)?;
            print_summary(&corpus.summary());
        }
        Commands::Search { corpus, query, limit, covid, start, end } => {
            if !config.accepts_query(&query) {
                return Err(anyhow!("query must have at least {} characters", config.min_query_chars));
            }
            let corpus = load_corpus(&corpus, &config)?;
            let opts = SearchOptions {
                limit: limit.unwrap_or(config.default_limit),
                covid_related: covid,
                start_date: start,
                end_date: end,
                ..SearchOptions::from_config(&config)
            };
            search(&corpus, &query, &opts);
        }
        Commands::List { corpus, tag, after, before, include_unknown, contains, matches, field, head, tail, sample } => {
            let mut view = load_corpus(&corpus, &config)?;
            if let Some(tag) = tag {
                view = view.filter_by_tag(tag);
            }
            if after.is_some() || before.is_some() {
                view = view.filter_by_date_range(after, before, include_unknown);
            }
            if let Some(needle) = contains {
                view = view.contains(&needle, field);
            }
            if let Some(pattern) = matches {
                view = view.filter_by_pattern(&pattern, field)?;
            }
            if let Some(n) = head {
                view = view.head(n);
            } else if let Some(n) = tail {
                view = view.tail(n);
            } else if let Some(n) = sample {
                view = view.sample(n);
            }
            print_summary(&view.summary());
            for (row, doc) in view.iter().enumerate() {
                let when = doc.published.map(format_date).unwrap_or_default();
                println!("{row:>5}  {when:<10}  {}", shorten(doc.title_str(), 100));
            }
        }
    }
    Ok(())
}

fn load_corpus(args: &CorpusArgs, config: &SearchConfig) -> Result<Corpus> {
    let rows = load_rows(&args.input)?;
    let corpus = Corpus::from_rows(rows, config.bm25)?;
    match &args.texts {
        Some(dir) => {
            let texts = load_text_tokens(dir)?;
            Ok(corpus.with_text_tokens(&texts))
        }
        None => Ok(corpus),
    }
}

fn search(corpus: &Corpus, query: &str, opts: &SearchOptions) {
    let results = corpus.search(query, opts);
    tracing::info!(query, hits = results.len(), "search finished");
    if results.is_empty() {
        println!("No papers matched \"{query}\"");
        return;
    }
    for hit in &results {
        let when = hit.published.map(format_date).unwrap_or_else(|| "unknown".into());
        println!("{:>3}. [{:.1}] {}", hit.row + 1, hit.score, shorten(&hit.title, 120));
        println!("     {when}  {}  {}", shorten(&hit.authors, 80), hit.url);
        println!("     {}", shorten(&hit.summary, 300));
        println!();
    }
}

fn print_summary(s: &CorpusSummary) {
    let date = |d: Option<Date>| d.map(format_date).unwrap_or_default();
    println!(
        "Papers: {}  Oldest: {}  Newest: {}  SARS-COV-2: {}  SARS: {}  Coronavirus: {}  Virus: {}  Antivirals: {}",
        s.papers,
        date(s.oldest),
        date(s.newest),
        s.covid_related,
        s.sars,
        s.coronavirus,
        s.virus,
        s.antivirals
    );
}

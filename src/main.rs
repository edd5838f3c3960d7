use clap::{Parser, Subcommand};
use review_index::cache::FragmentCache;
use review_index::{config, output, snapshot, url};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "review-index")]
#[command(version)]
#[command(about = "Index a directory of review artifacts into pages")]
#[command(long_about = "\
Index a directory of review artifacts into pages

Every directory holding matching files becomes one page; files directly in
the root become one page each. Pages are ordered by their relative path.

Review root structure:

  reviews/
  ├── review-index.toml             # Config (optional)
  ├── loose.png                     # Page \"loose.png\"
  ├── sample-001/                   # Page \"sample-001\"
  │   ├── photo.png                 # Image (svg, png, jpeg, jpg, gif, webp)
  │   ├── reviewer2_content.html    # HTML fragment shown on the page
  │   └── reviewer2_metadata.json   # JSON object shown as page metadata
  └── sample-002/
      └── a.webp

Run 'review-index gen-config' to print a documented review-index.toml.")]
struct Cli {
    /// Review root directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Skip files whose relative path contains this keyword (repeatable)
    #[arg(long, short = 'x', global = true)]
    exclude: Vec<String>,

    /// Also index hidden files and directories
    #[arg(long, global = true)]
    include_hidden: bool,

    /// Log every matched and excluded file
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index and write it as JSON
    Index {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build the index and print a report
    Check,
    /// Print one page as JSON
    Page {
        /// 1-based page number
        page: usize,
        /// Include the text of content fragments
        #[arg(long)]
        content: bool,
    },
    /// Print the reference for a page
    Url {
        /// Page number; any integer is accepted
        #[arg(allow_negative_numbers = true)]
        page: i64,
        /// Page the viewer came from (defaults to PAGE)
        #[arg(long, allow_negative_numbers = true)]
        last: Option<i64>,
    },
    /// Print a stock review-index.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Index { output: out } => {
            let config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            let snapshot = snapshot::build_snapshot(&cli.source, &config)?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            match out {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{}", json),
            }
            output::print_index_output(&snapshot);
        }
        Command::Check => {
            let config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            eprintln!("==> Checking {}", cli.source.display());
            let snapshot = snapshot::build_snapshot(&cli.source, &config)?;
            output::print_index_output(&snapshot);
            eprintln!("==> {} pages", snapshot.page_count());
        }
        Command::Page { page, content } => {
            let config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            let snapshot = snapshot::build_snapshot(&cli.source, &config)?;
            let view = snapshot.page(*page).ok_or_else(|| {
                format!(
                    "page {} out of range (index has {} pages)",
                    page,
                    snapshot.page_count()
                )
            })?;
            output::print_page_output(&view);

            let mut json = serde_json::to_value(&view)?;
            if *content {
                let mut cache = FragmentCache::new(config.serving.dev_mode);
                let fragments: Vec<serde_json::Value> = view
                    .load_fragments(&snapshot.root, &mut cache)?
                    .into_iter()
                    .map(|f| serde_json::json!({ "path": f.path, "content": &*f.content }))
                    .collect();
                json["content"] = serde_json::Value::Array(fragments);
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Url { page, last } => {
            println!("{}", url::page_url(*page, last.unwrap_or(*page)));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

/// Resolve config: stock defaults, the root's config file, then flags.
/// Keywords given on the command line rank after those from the file.
fn load_config(cli: &Cli) -> Result<config::IndexConfig, config::ConfigError> {
    let mut overrides = toml::Table::new();
    if cli.include_hidden {
        overrides.insert("include_hidden".into(), toml::Value::Boolean(true));
    }
    let mut config = config::load_config(&cli.source, Some(toml::Value::Table(overrides)))?;
    config.exclude.extend(cli.exclude.iter().cloned());
    config.validate()?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

//! warcrawl main entry point
//!
//! This is the command-line interface for the warcrawl web archiver.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use warcrawl::config::{
    apply_setting_arg, load_config_with_hash, load_seed_urls, validate, Config,
};
use warcrawl::crawler::{crawl, DEFAULT_CACHE_DIR};
use warcrawl::output::print_statistics;
use warcrawl::warc::{extract_content, list_target_uris, RecordType, WarcError, WarcReader};
use warcrawl::{ConfigError, WarcrawlError};

/// warcrawl: archive web pages and their requisites as WARC
///
/// Crawls seed URLs, follows embedded resources and linked pages up to a
/// depth limit, and records every exchange into a WARC file that can be
/// listed and extracted later.
#[derive(Parser, Debug)]
#[command(name = "warcrawl")]
#[command(version)]
#[command(about = "Archive web pages and their requisites as WARC", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl URLs into a new WARC file
    Archive {
        /// WARC file to create
        #[arg(value_name = "WARC")]
        output: PathBuf,

        /// Seed URLs
        #[arg(value_name = "URLS")]
        urls: Vec<String>,

        /// File with one seed URL per line
        #[arg(short, long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// Maximum page-to-page hops from a seed
        #[arg(long, value_name = "N")]
        max_depth: Option<u32>,

        /// Restrict discovered resources to these patterns
        #[arg(long, value_name = "PATTERN", num_args = 1..)]
        allowed_uris: Vec<String>,

        /// Cache responses on disk and replay them on later runs
        #[arg(long)]
        cache: bool,

        /// Cache directory (implies --cache)
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// User-Agent header sent with every request
        #[arg(long, value_name = "AGENT")]
        user_agent: Option<String>,

        /// Override a setting, e.g. -s crawler.max-redirects=5
        #[arg(short, long = "settings", value_name = "KEY=VALUE")]
        settings: Vec<String>,
    },

    /// Print the target URIs stored in a WARC file
    List {
        /// WARC file to read
        #[arg(value_name = "WARC")]
        archive: PathBuf,

        /// Record type to list
        #[arg(long, default_value = "response")]
        record_type: String,
    },

    /// Write the body stored for a URI to a file or stdout
    Extract {
        /// WARC file to read
        #[arg(value_name = "WARC")]
        archive: PathBuf,

        /// Target URI of the response record
        #[arg(value_name = "URI")]
        uri: String,

        /// Output file, or `-` for stdout
        #[arg(value_name = "OUTPUT")]
        output: String,

        /// Bytes read and written per chunk
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,
    },
}

/// Operator-facing failures decided in the binary
#[derive(Debug, Error)]
enum CliError {
    #[error("File not found: {0}")]
    MissingFile(PathBuf),

    #[error("URI not found in archive: {0}")]
    UriNotFound(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Archive {
            output,
            urls,
            input_file,
            max_depth,
            allowed_uris,
            cache,
            cache_dir,
            user_agent,
            settings,
        } => {
            let overrides = ArchiveOverrides {
                max_depth,
                allowed_uris,
                cache: cache || cache_dir.is_some(),
                cache_dir,
                user_agent,
                settings,
            };
            handle_archive(cli.config.as_deref(), overrides, &output, urls, input_file, cli.quiet)
                .await
        }
        Command::List {
            archive,
            record_type,
        } => handle_list(&archive, &record_type),
        Command::Extract {
            archive,
            uri,
            output,
            chunk_size,
        } => handle_extract(cli.config.as_deref(), &archive, &uri, &output, chunk_size),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warcrawl=info,warn"),
            1 => EnvFilter::new("warcrawl=debug,info"),
            2 => EnvFilter::new("warcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(io::stderr)
        .init();
}

/// Maps a failure to the process exit status
///
/// 1 no seeds, 2 missing input or archive file, 3 URI not in archive,
/// 4 invalid configuration, 5 anything else.
fn exit_status(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            return match cli {
                CliError::MissingFile(_) => 2,
                CliError::UriNotFound(_) => 3,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 4;
        }
        if let Some(crawl) = cause.downcast_ref::<WarcrawlError>() {
            match crawl {
                WarcrawlError::NoSeeds => return 1,
                WarcrawlError::Config(_) => return 4,
                _ => {}
            }
        }
    }
    5
}

fn require_file(path: &Path) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::MissingFile(path.to_path_buf()))
    }
}

/// Loads the configuration file when one is given, defaults otherwise
fn load_base_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    require_file(path)?;

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Command-line values layered over the configuration file
struct ArchiveOverrides {
    max_depth: Option<u32>,
    allowed_uris: Vec<String>,
    cache: bool,
    cache_dir: Option<PathBuf>,
    user_agent: Option<String>,
    settings: Vec<String>,
}

impl ArchiveOverrides {
    /// Applies `--settings` first, then the dedicated flags, then validates
    fn apply(self, config: &mut Config) -> Result<(), ConfigError> {
        for setting in &self.settings {
            apply_setting_arg(config, setting)?;
        }
        if let Some(depth) = self.max_depth {
            config.crawler.max_depth = depth;
        }
        if !self.allowed_uris.is_empty() {
            config.scope.allowed_uris = self.allowed_uris;
        }
        if let Some(agent) = self.user_agent {
            config.fetch.user_agent = agent;
        }
        if self.cache {
            let dir = match self.cache_dir {
                Some(dir) => dir.to_string_lossy().into_owned(),
                None => config
                    .fetch
                    .cache_dir
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()),
            };
            config.fetch.cache_dir = Some(dir);
        }
        validate(config)
    }
}

/// Handles the `archive` command: crawls seeds into a new WARC file
async fn handle_archive(
    config_path: Option<&Path>,
    overrides: ArchiveOverrides,
    output: &Path,
    mut seeds: Vec<String>,
    input_file: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = load_base_config(config_path)?;
    overrides
        .apply(&mut config)
        .context("Invalid crawl settings")?;

    if let Some(path) = input_file {
        require_file(&path)?;
        let from_file = load_seed_urls(&path)
            .with_context(|| format!("Failed to read seed list {}", path.display()))?;
        tracing::info!("Read {} seed URL(s) from {}", from_file.len(), path.display());
        seeds.extend(from_file);
    }
    if seeds.is_empty() {
        return Err(WarcrawlError::NoSeeds.into());
    }

    tracing::info!(
        "Max depth: {}, allow-list: {}",
        config.crawler.max_depth,
        if config.scope.allowed_uris.is_empty() {
            "unrestricted".to_string()
        } else {
            config.scope.allowed_uris.join(", ")
        }
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight fetches");
            interrupt.cancel();
        }
    });

    let stats = crawl(config, &seeds, output, cancel)
        .await
        .with_context(|| format!("Archive run for {} failed", output.display()))?;

    tracing::info!("Archive written to {}", output.display());
    if !quiet {
        print_statistics(&stats);
    }
    Ok(())
}

/// Handles the `list` command: prints target URIs in file order
fn handle_list(archive: &Path, record_type: &str) -> anyhow::Result<()> {
    require_file(archive)?;
    let mut reader = WarcReader::open(archive)?;
    let uris = list_target_uris(&mut reader, &RecordType::parse(record_type))
        .with_context(|| format!("Failed to read {}", archive.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for uri in uris {
        writeln!(out, "{}", uri)?;
    }
    out.flush()?;
    Ok(())
}

/// Handles the `extract` command: streams one stored body out in chunks
fn handle_extract(
    config_path: Option<&Path>,
    archive: &Path,
    uri: &str,
    output: &str,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    require_file(archive)?;
    let chunk_size = match chunk_size {
        Some(size) => size,
        None => load_base_config(config_path)?.output.chunk_size,
    };
    if chunk_size == 0 {
        return Err(ConfigError::Validation("chunk size must be at least 1".to_string()).into());
    }

    let mut reader = WarcReader::open(archive)?;
    let copied = extract_content(&mut reader, uri, |content| {
        if output == "-" {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            copy_chunked(content, &mut out, chunk_size)
        } else {
            let mut out = File::create(output)?;
            copy_chunked(content, &mut out, chunk_size)
        }
    })
    .with_context(|| format!("Failed to extract {} from {}", uri, archive.display()))?
    .ok_or_else(|| CliError::UriNotFound(uri.to_string()))?;

    tracing::debug!("Extracted {} byte(s) for {}", copied, uri);
    Ok(())
}

/// Copies `input` to `output` one `chunk_size` buffer at a time
fn copy_chunked<R: Read + ?Sized, W: Write>(
    input: &mut R,
    output: &mut W,
    chunk_size: usize,
) -> Result<u64, WarcError> {
    let mut buffer = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        output.write_all(&buffer[..read])?;
        total += read as u64;
    }
    output.flush()?;
    Ok(total)
}

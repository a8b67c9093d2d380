//! # cp949-codec CLI
//!
//! Command-line front end for converting files between CP949 and UTF-8,
//! inspecting the mapping table and compiling new tables from mapping
//! listings.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cp949_codec::cache::{self, TableStats};
use cp949_codec::registry::{self, Registry};
use cp949_codec::{CodecConfig, StreamTranslator, TableCache, Translate, table};

/// cp949-codec: table-driven CP949 <-> UTF-8 converter
#[derive(Parser)]
#[command(name = "cp949-codec")]
#[command(version, about, long_about = None)]
#[command(author = "cp949-codec Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Binary table file (overrides CP949_TABLE and the config file)
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// JSON configuration file (replaces environment configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read buffer size (KB)
    #[arg(long, global = true)]
    buffer_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CP949 input to UTF-8
    Decode(IoArgs),

    /// Convert UTF-8 input to CP949
    Encode(IoArgs),

    /// Convert between two registered encodings (one of them UTF-8)
    Convert(ConvertArgs),

    /// List registered encodings
    List,

    /// Display statistics about the loaded table
    Info,

    /// Compile a mapping listing (CP949.TXT layout) into a binary table
    BuildTable(BuildTableArgs),
}

#[derive(Args)]
struct IoArgs {
    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Source encoding
    #[arg(short = 'f', long = "from")]
    from: String,

    /// Target encoding
    #[arg(short = 't', long = "to")]
    to: String,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args)]
struct BuildTableArgs {
    /// Mapping listing to compile
    #[arg(short, long)]
    input: PathBuf,

    /// Binary table to write
    #[arg(short, long, default_value = "cp949.dat")]
    output: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct ConversionResult {
    success: bool,
    bytes_processed: u64,
    bytes_written: u64,
    processing_time_ms: u64,
}

#[derive(Serialize)]
struct BuildResult {
    pairs: usize,
    bytes_written: usize,
    output: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Decode(ref args) => {
            install_cache(&config);
            let translator = cache::global()?.decoder().context("Failed to load decode table")?;
            run_conversion(translator, args, &config, &cli)?
        }
        Commands::Encode(ref args) => {
            install_cache(&config);
            let translator = cache::global()?.encoder().context("Failed to load encode table")?;
            run_conversion(translator, args, &config, &cli)?
        }
        Commands::Convert(ref args) => {
            install_cache(&config);
            let translator = Registry::with_defaults()
                .converter(&args.from, &args.to)
                .with_context(|| {
                    format!("Failed to create translator from {} to {}", args.from, args.to)
                })?;
            run_conversion(translator, &args.io, &config, &cli)?
        }
        Commands::List => list_command(&cli)?,
        Commands::Info => info_command(&config, &cli)?,
        Commands::BuildTable(ref args) => build_table_command(args, &cli)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Flags override the config file, which replaces the environment
fn load_config(cli: &Cli) -> Result<CodecConfig> {
    let base: CodecConfig = match cli.config {
        Some(ref path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => CodecConfig::from_env().context("Invalid environment configuration")?,
    };

    let buffer_size = match cli.buffer_size {
        Some(kb) => Some(
            kb.checked_mul(1024)
                .with_context(|| format!("Buffer size of {kb} KB is too large"))?,
        ),
        None => None,
    };

    let config = base.with_overrides(cli.table.clone(), buffer_size);
    config.validate()?;
    Ok(config)
}

fn install_cache(config: &CodecConfig) {
    if cache::install_global(TableCache::from_config(config)).is_err() {
        debug!("global table cache already initialized");
    }
}

fn run_conversion<T: Translate>(
    translator: T,
    args: &IoArgs,
    config: &CodecConfig,
    cli: &Cli,
) -> Result<()> {
    let start_time = Instant::now();

    let reader: Box<dyn Read> = match args.input {
        Some(ref path) => {
            info!(input = %path.display(), "reading input");
            Box::new(BufReader::new(File::open(path).with_context(|| {
                format!("Failed to open input file: {}", path.display())
            })?))
        }
        None => Box::new(io::stdin().lock()),
    };

    let writer: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    };

    let stats = StreamTranslator::new(translator, config.buffer_size)
        .run(reader, writer)
        .context("Conversion failed")?;

    let processing_time = start_time.elapsed();
    info!(
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        elapsed = ?processing_time,
        "conversion finished"
    );

    match cli.format {
        OutputFormat::Json => {
            let result = ConversionResult {
                success: true,
                bytes_processed: stats.bytes_read,
                bytes_written: stats.bytes_written,
                processing_time_ms: processing_time.as_millis() as u64,
            };
            eprintln!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            if cli.verbose {
                eprintln!("✓ Conversion completed successfully");
            }
        }
    }

    Ok(())
}

fn list_command(cli: &Cli) -> Result<()> {
    let registry = Registry::with_defaults();

    match cli.format {
        OutputFormat::Json => {
            let encodings: Vec<_> = registry
                .entries()
                .map(|entry| {
                    serde_json::json!({
                        "name": entry.name,
                        "aliases": entry.aliases,
                        "description": entry.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&encodings)?);
        }
        OutputFormat::Text => {
            println!("Supported Encodings (paired with {}):", registry::UTF8);
            println!();
            for entry in registry.entries() {
                println!("{:15} {}", entry.name, entry.description);
                if !entry.aliases.is_empty() {
                    println!("                aliases: {}", entry.aliases.join(", "));
                }
            }
        }
    }

    Ok(())
}

fn info_command(config: &CodecConfig, cli: &Cli) -> Result<()> {
    let cache = TableCache::from_config(config);
    let stats = cache
        .stats()
        .with_context(|| format!("Failed to load table from {}", cache.source()))?;

    match cli.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "source": cache.source().to_string(),
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        OutputFormat::Text => print_stats(&cache.source().to_string(), &stats),
    }

    Ok(())
}

fn print_stats(source: &str, stats: &TableStats) {
    println!("Table: {}", source);
    println!("Mapped codes: {}", stats.pairs);
    if let Some((low, high)) = stats.native_range {
        println!("Native range: 0x{:04X}..=0x{:04X}", low, high);
    }
    if let Some((low, high)) = stats.scalar_range {
        println!("Unicode range: U+{:04X}..=U+{:04X}", low, high);
    }
    println!("Duplicate scalars: {}", stats.duplicate_scalars);
}

fn build_table_command(args: &BuildTableArgs, cli: &Cli) -> Result<()> {
    let listing = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read mapping file: {}", args.input.display()))?;
    let pairs = table::parse_mapping_text(&listing)
        .with_context(|| format!("Invalid mapping file: {}", args.input.display()))?;

    let raw = table::write(&pairs);
    write_output(&args.output, &raw)?;
    info!(pairs = pairs.len(), bytes = raw.len(), "table written");

    match cli.format {
        OutputFormat::Json => {
            let result = BuildResult {
                pairs: pairs.len(),
                bytes_written: raw.len(),
                output: args.output.display().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!(
                "Wrote {} code pairs ({} bytes) to {}",
                pairs.len(),
                raw.len(),
                args.output.display()
            );
        }
    }

    Ok(())
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("Failed to write output file: {}", path.display()))
}

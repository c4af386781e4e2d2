//! fctools - Regenerate protocol constants and dump packet log schemas
//!
//! `gen-constants` scrapes the site's client script and server configuration
//! into `Constants.ts`. `dump-schema` reads a packet inspector log and writes
//! one JSON schema per packet type.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fctools_core::codegen::{DEFAULT_CONFIG_URL, DEFAULT_OUTPUT_FILE, DEFAULT_SCRIPT_URL};
use fctools_core::json::to_pretty_string;
use fctools_core::output::write_atomic;
use fctools_core::schema::{DEFAULT_LOG_FILE, DEFAULT_SCHEMA_FILE};
use fctools_core::{
    infer_from_file, regenerate, HttpFetcher, InferencerConfig, Scanner, Sources, StatsWriter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Regenerate protocol constants and dump packet log schemas
#[derive(Parser, Debug)]
#[command(name = "fctools")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the client script and server config into Constants.ts
    GenConstants(GenConstantsArgs),
    /// Infer a JSON schema per packet type from a packet log
    DumpSchema(DumpSchemaArgs),
}

#[derive(Args, Debug)]
struct GenConstantsArgs {
    /// Client script to scan for constant definitions
    #[arg(long, default_value = DEFAULT_SCRIPT_URL)]
    script_url: String,

    /// Server configuration document to embed
    #[arg(long, default_value = DEFAULT_CONFIG_URL)]
    config_url: String,

    /// Generated TypeScript file
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Print the generated file instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DumpSchemaArgs {
    /// Packet log written by the packet inspector
    #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,

    /// Schema document to write
    #[arg(short, long, default_value = DEFAULT_SCHEMA_FILE)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::GenConstants(args) => gen_constants(args),
        Command::DumpSchema(args) => dump_schema(args),
    }
}

/// Regenerate the constants file from the remote sources
fn gen_constants(args: &GenConstantsArgs) -> Result<()> {
    let sources = Sources {
        script_url: args.script_url.clone(),
        config_url: args.config_url.clone(),
    };

    let fetcher = HttpFetcher::new().context("Failed to set up HTTP client")?;
    let regenerated = regenerate(&fetcher, &Scanner::new(), &sources)
        .context("Failed to collect constants")?;

    let generator = regenerated.generator();
    let content = generator.render().context("Failed to render constants")?;

    let mut stats = StatsWriter::default();
    generator.write_with(&mut stats)?;
    info!(
        "Generated {} enums with {} entries ({} client-side), {} bytes of server config",
        stats.enum_count, stats.entry_count, stats.negative_count, stats.config_bytes
    );

    if args.dry_run {
        print!("{}", content);
        return Ok(());
    }

    publish(&args.output, &content)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}

/// Infer packet schemas from the log and write them out
fn dump_schema(args: &DumpSchemaArgs) -> Result<()> {
    let schemas = infer_from_file(&args.log, InferencerConfig::default())
        .with_context(|| format!("Failed to infer schemas from {}", args.log.display()))?;

    let content = to_pretty_string(&schemas)?;
    publish(&args.output, &content)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}

/// Atomically write `content`, logging whether it differs from what was there
fn publish(path: &Path, content: &str) -> Result<()> {
    let new_hash = content_hash(content);
    match fs::read_to_string(path) {
        Ok(previous) if content_hash(&previous) == new_hash => {
            info!("{} is unchanged ({})", path.display(), new_hash);
        }
        Ok(_) => info!("{} changed, now {}", path.display(), new_hash),
        Err(_) => debug!("{} does not exist yet", path.display()),
    }

    write_atomic(path, content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Compute a short hash of the content (first 8 chars of blake3)
fn content_hash(content: &str) -> String {
    let hash = blake3::hash(content.as_bytes());
    hash.to_hex()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash() {
        let hash1 = content_hash("hello");
        let hash2 = content_hash("hello");
        let hash3 = content_hash("world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 8);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["fctools", "gen-constants"]);
        let Command::GenConstants(args) = cli.command else {
            panic!("expected gen-constants");
        };
        assert_eq!(args.script_url, DEFAULT_SCRIPT_URL);
        assert_eq!(args.config_url, DEFAULT_CONFIG_URL);
        assert_eq!(args.output, PathBuf::from("Constants.ts"));
        assert!(!args.dry_run);

        let cli = Cli::parse_from(["fctools", "-vv", "dump-schema"]);
        assert_eq!(cli.verbose, 2);
        let Command::DumpSchema(args) = cli.command else {
            panic!("expected dump-schema");
        };
        assert_eq!(args.log, PathBuf::from("packetLog.txt"));
        assert_eq!(args.output, PathBuf::from("packetLogSchema.json"));
    }

    #[test]
    fn test_dump_schema_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("packetLog.txt");
        let output = temp_dir.path().join("out/packetLogSchema.json");
        fs::write(
            &log,
            "[2017/06/30 - 21:04:17, PACKETLOG.TXT] {\"FCType\":\"ROOMDATA\",\"sMessage\":{}}\r\n\
             [2017/06/30 - 21:04:18, PACKETLOG.TXT] {\"FCType\":\"LOGIN\"}\r\n",
        )
        .unwrap();

        dump_schema(&DumpSchemaArgs {
            log,
            output: output.clone(),
        })
        .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("{\n    \"LOGIN\": {\n        \""));
        assert!(written.contains("\"type\": \"null\""));
        assert!(!written.contains("ROOMDATA"));
    }

    #[test]
    fn test_dump_schema_failure_publishes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("packetLog.txt");
        let output = temp_dir.path().join("packetLogSchema.json");
        fs::write(&output, "previous").unwrap();
        fs::write(&log, "[2017/06/30 - 21:04:17, PACKETLOG.TXT] not json\r\n").unwrap();

        assert!(dump_schema(&DumpSchemaArgs {
            log,
            output: output.clone(),
        })
        .is_err());
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

//! FlashRESP - A Resumable Redis Reply Decoder
//!
//! This is the entry point for the `flashresp` tool. It reads a stream of
//! RESP replies from stdin (or a file) and prints each one the way
//! `redis-cli` would.

use anyhow::Context;
use bumpalo::Bump;
use flashresp::protocol::ParserConfig;
use flashresp::stream::{ReaderConfig, ReaderStats, ReplyReader};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Tool configuration
struct Config {
    /// File to read replies from; stdin when absent
    input: Option<PathBuf>,
    /// Reject bulk strings without a trailing CRLF
    strict: bool,
    /// Maximum array nesting depth
    max_depth: usize,
    /// Cap on arena bytes per reply
    arena_limit: Option<usize>,
    /// Log at debug level unless RUST_LOG says otherwise
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            strict: false,
            max_depth: ParserConfig::default().max_depth,
            arena_limit: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--input" | "-i" => {
                    if i + 1 < args.len() {
                        config.input = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    } else {
                        eprintln!("Error: --input requires a value");
                        std::process::exit(1);
                    }
                }
                "--max-depth" => {
                    if i + 1 < args.len() {
                        config.max_depth = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid nesting depth");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --max-depth requires a value");
                        std::process::exit(1);
                    }
                }
                "--arena-limit" => {
                    if i + 1 < args.len() {
                        config.arena_limit = Some(args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid arena limit");
                            std::process::exit(1);
                        }));
                        i += 2;
                    } else {
                        eprintln!("Error: --arena-limit requires a value");
                        std::process::exit(1);
                    }
                }
                "--strict" => {
                    config.strict = true;
                    i += 1;
                }
                "--verbose" => {
                    config.verbose = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlashRESP version {}", flashresp::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            parser: ParserConfig {
                max_depth: self.max_depth,
                strict_trailing_crlf: self.strict,
                ..ParserConfig::default()
            },
            ..ReaderConfig::default()
        }
    }
}

fn print_help() {
    println!(
        r#"
FlashRESP - A Resumable Redis Reply Decoder

USAGE:
    flashresp [OPTIONS]

OPTIONS:
    -i, --input <FILE>       Read replies from FILE instead of stdin
        --strict             Reject bulk strings not terminated by CRLF
        --max-depth <N>      Maximum array nesting depth (default: 32)
        --arena-limit <B>    Fail replies needing more than B bytes of arena
        --verbose            Log decoder progress (overridden by RUST_LOG)
    -v, --version            Print version information
    -h, --help               Print this help message

EXAMPLES:
    printf '*2\r\n$3\r\nfoo\r\n:1\r\n' | flashresp
    ["foo", (integer) 1]

    flashresp --strict --input captured.resp
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging; stdout carries the decoded replies
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let input: Box<dyn AsyncRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let stats = Arc::new(ReaderStats::new());
    let mut reader = ReplyReader::with_config(input, config.reader_config(), Arc::clone(&stats));
    let mut stdout = tokio::io::stdout();

    // One arena scope per reply
    let mut arena = Bump::new();
    arena.set_allocation_limit(config.arena_limit);
    loop {
        arena.reset();
        let Some(reply) = reader
            .read_reply(&arena)
            .await
            .context("failed to decode reply")?
        else {
            break;
        };

        let line = format!("{reply}\n");
        stdout.write_all(line.as_bytes()).await?;
        debug!(
            reply_type = %reply.reply_type(),
            arena_bytes = arena.allocated_bytes(),
            "Rendered reply"
        );
    }
    stdout.flush().await?;

    info!(
        replies = stats.replies_decoded.load(Ordering::Relaxed),
        bytes = stats.bytes_read.load(Ordering::Relaxed),
        "Input exhausted"
    );
    Ok(())
}

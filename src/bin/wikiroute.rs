use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wikiroute::{build, serve, BuildOptions, Language, ServeOptions};

#[derive(Parser, Debug)]
#[command(
    name = "wikiroute",
    version,
    about = "Find every shortest hyperlink path between two Wikipedia articles"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build link stores from downloaded SQL dumps.
    Build {
        /// Comma-separated language codes, e.g. "en,de".
        #[arg(long, default_value = "en")]
        languages: String,

        /// Human-readable language name; defaults to the code. Only applies
        /// when a single language is built.
        #[arg(long)]
        language_name: Option<String>,

        /// Directory holding the `<wiki>-<date>-<table>.sql.gz` dump files.
        #[arg(long, default_value = "dumps")]
        dumps: PathBuf,

        /// Directory to write finished stores into.
        #[arg(long, default_value = "databases")]
        databases: PathBuf,

        /// Dump date (yyyymmdd); the newest complete set when omitted.
        #[arg(long)]
        date: Option<String>,

        /// Parser worker threads; all cpus by default.
        #[arg(long)]
        threads: Option<usize>,

        /// Approximate ceiling on buffered link memory, in bytes. Buffers
        /// are flushed to disk early when it is exceeded.
        #[arg(long)]
        memory_limit: Option<u64>,
    },
    /// Serve built stores over HTTP.
    Serve {
        /// Directory of built stores.
        #[arg(long, default_value = "databases")]
        databases: PathBuf,

        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:1789")]
        listen: SocketAddr,

        /// Result cache budget in bytes.
        #[arg(long, default_value_t = 64 * 1024 * 1024)]
        cache_bytes: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Build {
            languages,
            language_name,
            dumps,
            databases,
            date,
            threads,
            memory_limit,
        } => {
            let codes: Vec<&str> = languages
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .collect();
            let language_name = if codes.len() > 1 && language_name.is_some() {
                warn!("--language-name ignored when building multiple languages");
                None
            } else {
                language_name
            };
            let languages: Vec<Language> = codes
                .iter()
                .map(|code| Language::new(code, language_name.as_deref()))
                .collect();

            let options = BuildOptions {
                databases_dir: databases,
                dumps_dir: dumps,
                date,
                threads: threads.unwrap_or_else(|| {
                    thread::available_parallelism()
                        .map(NonZeroUsize::get)
                        .unwrap_or(1)
                }),
                memory_limit,
            };
            build::build_all(&languages, &options)?;
            Ok(())
        }
        Command::Serve {
            databases,
            listen,
            cache_bytes,
        } => {
            let options = ServeOptions {
                databases_dir: databases,
                listen,
                cache_bytes,
            };
            serve::serve(&options).await?;
            Ok(())
        }
    }
}

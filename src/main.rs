//! Binary entrypoint for the SinkChat CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and the default language file
//! - `check` - validate the configuration and report channel registration problems
//! - `replay <script>` - run a scripted chat session against the in-memory host
//!
//! See the library crate docs for module-level details: `sinkchat::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use sinkchat::chat::format::strip_colors;
use sinkchat::chat::memory::MemoryDirectory;
use sinkchat::chat::ChatServer;
use sinkchat::config::Config;
use sinkchat::lang::Language;
use sinkchat::logutil::LogSinks;
use sinkchat::replay::{self, ReplayScript};
use sinkchat::storage::PlayerStore;

#[derive(Parser)]
#[command(name = "sinkchat")]
#[command(about = "Chat channel routing for game servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration and language file
    Init,
    /// Validate the configuration and channel setup
    Check,
    /// Replay a scripted chat session and print what everyone received
    Replay {
        /// Replay script (TOML)
        script: String,
        /// Keep color codes in the output
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new SinkChat configuration");
            if tokio::fs::metadata(&cli.config).await.is_ok() {
                warn!("{} already exists, leaving it untouched", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                println!("Created default configuration at {}", cli.config);
            }
            let config = Config::load(&cli.config).await?;
            Language::load_or_create(&config.language.file).await?;
            tokio::fs::create_dir_all(&config.storage.data_dir).await?;
            println!("Language file: {}", config.language.file);
            println!("Data directory: {}", config.storage.data_dir);
        }
        Commands::Check => {
            let config = pre_config.ok_or_else(|| anyhow!("Failed to load config file {}", cli.config))?;
            let problems = config.validate();
            for problem in &problems {
                error!("config: {}", problem);
                println!("problem: {}", problem);
            }

            let lang = Arc::new(Language::load_or_create(&config.language.file).await?);
            let missing = lang.missing_keys();
            if !missing.is_empty() {
                println!("language file is missing {} keys (defaults used)", missing.len());
            }
            let store = Arc::new(PlayerStore::open(&config.storage.data_dir).await?);
            let server = ChatServer::new(&config, Arc::new(MemoryDirectory::new()), lang, store);
            println!("Registered channels:");
            for channel in server.registry().channels() {
                println!(
                    "  {} {} ({}){}",
                    channel.call_char(),
                    channel.name(),
                    channel.kind().as_str(),
                    channel
                        .permission()
                        .map(|p| format!(" requires {}", p))
                        .unwrap_or_default()
                );
            }
            for rejected in server.rejected() {
                println!("rejected: {}", rejected);
            }
            if problems.is_empty() && server.rejected().is_empty() {
                println!("Configuration OK");
            } else {
                std::process::exit(1);
            }
        }
        Commands::Replay { script, raw } => {
            let config = match pre_config {
                Some(config) => config,
                None => {
                    warn!("No usable config at {}, using defaults", cli.config);
                    Config::default()
                }
            };
            let content = tokio::fs::read_to_string(&script)
                .await
                .map_err(|e| anyhow!("Failed to read replay script {}: {}", script, e))?;
            let parsed = ReplayScript::from_toml_str(&content)?;
            let lang = match tokio::fs::read_to_string(&config.language.file).await {
                Ok(text) => Language::from_toml_str(&text)?,
                Err(_) => Language::defaults(),
            };
            let report = replay::run(&config, Arc::new(lang), &parsed).await?;

            let show = |line: &str| if raw { line.to_string() } else { strip_colors(line) };
            for (name, inbox) in &report.inboxes {
                println!("== {} ({} lines)", name, inbox.len());
                for line in inbox {
                    println!("  {}", show(line));
                }
            }
            println!("== console ({} lines)", report.console.len());
            for line in &report.console {
                println!("  {}", show(line));
            }
            for (source, text) in &report.relayed {
                println!("relay [{}] {}", source, text);
            }
            let m = &report.metrics;
            println!(
                "channel={} local={} spy={} cancelled={} failures={}",
                m.channel_messages, m.local_messages, m.spy_copies, m.cancelled, m.delivery_failures
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let sinks = match config {
        Some(c) => LogSinks::open(c.logging.file.as_deref(), c.logging.chat_file.as_deref()),
        None => LogSinks::default(),
    };
    // Redirected stdout already goes to the log file
    let to_stdout = !sinks.has_main() || atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        sinks.write(record.target(), &line);

        if to_stdout {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}

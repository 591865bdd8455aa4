use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use sgravoquest::config::Config;
use sgravoquest::server::{self, AppState};

#[derive(Parser)]
#[command(name = "sgravoquest")]
#[command(about = "Tile RPG client and LLM quest generation proxy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "sgravoquest.toml", global = true)]
    config: PathBuf,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the quest generation proxy
    Serve {
        /// Address to listen on (e.g., 0.0.0.0:3000)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Open the game window
    Play {
        /// Quest proxy endpoint
        #[arg(long)]
        proxy_url: Option<String>,
        /// Prompt sent when pressing G
        #[arg(long)]
        prompt: Option<String>,
        /// Local mirror of the asset CDN
        #[arg(long)]
        assets: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.command {
        Commands::Init => None,
        _ => Some(Config::load_or_default(&cli.config)?),
    };
    init_logging(config.as_ref(), cli.verbose);

    match cli.command {
        Commands::Init => {
            if cli.config.exists() {
                warn!("{} already exists, leaving it untouched", cli.config.display());
                return Ok(());
            }
            Config::create_default(&cli.config)?;
            info!("Wrote default configuration to {}", cli.config.display());
        }
        Commands::Serve { bind } => {
            let mut config = config.take().unwrap_or_default();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let addr = config.bind_addr()?;
            let state = AppState::from_config(&config.provider);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(addr, state))?;
        }
        Commands::Play { proxy_url, prompt, assets } => {
            let mut config = config.take().unwrap_or_default();
            if let Some(url) = proxy_url {
                config.client.proxy_url = url;
            }
            if let Some(prompt) = prompt {
                config.client.default_prompt = prompt;
            }
            if assets.is_some() {
                config.client.asset_dir = assets;
            }
            config.validate()?;
            sgravoquest::engine::run(config)?;
        }
    }
    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    // -v flags override the configured level
    let base_level = match verbosity {
        0 => config
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // wgpu and winit are very chatty below warn
    for noisy in ["wgpu_core", "wgpu_hal", "naga", "winit"] {
        builder.filter_module(noisy, log::LevelFilter::Warn);
    }

    let log_file = config.and_then(|c| c.logging.file.as_deref()).and_then(open_log_file);
    match log_file {
        Some(file) => {
            let file = std::sync::Mutex::new(file);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                writeln!(fmt, "{}", line)
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

fn open_log_file(path: &Path) -> Option<std::fs::File> {
    std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
}

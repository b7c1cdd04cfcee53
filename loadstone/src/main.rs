mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use loadstone_core::conf::{self, DEFAULT_CONFIG_PATH};
use loadstone_core::{logging, server};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "loadstone",
    version,
    about = "HTTP reverse-proxy load balancer"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the load balancer (default).
    Run {
        /// Path to the YAML config file.
        #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Run a single demonstration backend.
    Backend {
        /// Address to listen on, e.g. 127.0.0.1:8081.
        #[arg(long)]
        listen: String,
    },

    /// Run the balancer with every configured backend in-process, applying
    /// the staggered-outage schedule when `servers_outage` is set.
    Demo {
        /// Path to the YAML config file.
        #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Fire a stream of requests at the balancer, stopping early on 503.
    Storm {
        #[arg(long, default_value = "http://127.0.0.1:8080/resource1")]
        url: String,

        #[arg(long, default_value_t = 100_000)]
        requests: u64,
    },
}

fn main() {
    if let Err(error) = try_main() {
        eprintln!("loadstone: {error:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Run { config }) => run_balancer(&config),
        Some(Command::Backend { listen }) => cli::backend::run(&listen),
        Some(Command::Demo { config }) => cli::demo::run(&config),
        Some(Command::Storm { url, requests }) => cli::storm::run(&url, requests),
        None => run_balancer(Path::new(DEFAULT_CONFIG_PATH)),
    }
}

fn run_balancer(config_path: &Path) -> Result<()> {
    let config = conf::load_config(config_path)?;
    logging::init(&config.logging)?;
    server::run(config)
}

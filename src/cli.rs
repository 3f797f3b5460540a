//! Command-line flags and logging setup.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Browser assistant for cleaning and improving NXOpen code
#[derive(Parser, Debug)]
#[command(name = "nxgenie", version, about)]
pub struct Cli {
    /// Config file (default: <config dir>/nxgenie/config.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for saved sessions
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Address to serve the UI on
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Debug logging to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Flags take precedence over the config file and environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(bind) = &self.bind {
            config.bind.clone_from(bind);
        }
    }
}

/// Install the stderr subscriber.
///
/// `NXGENIE_LOG` or `RUST_LOG` select the filter; `--verbose` without
/// either turns on debug output for this crate.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("NXGENIE_LOG")
        .ok()
        .map(EnvFilter::new)
        .or_else(|| std::env::var("RUST_LOG").ok().map(EnvFilter::new))
        .unwrap_or_else(|| {
            EnvFilter::new(if verbose { "nxgenie=debug" } else { "nxgenie=info" })
        });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

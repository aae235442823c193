//! CLI flags and the resolved runtime configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

/// Target a file or directory to be backed up regularly
#[derive(Parser, Debug)]
#[command(name = "bak")]
#[command(author, version)]
#[command(
    about = "Target a file or directory to be backed up regularly",
    long_about = "A utility to watch a file or directory for changes and back up \
                  the file(s) to a separate location at specified intervals."
)]
pub struct Cli {
    /// The path to the file or directory to watch
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// The path to the directory where files should be backed up to
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// The interval to back up changed files (e.g. 30s, 5m, 1h)
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    pub interval: Duration,
}

/// Immutable runtime configuration, resolved once at startup and
/// passed down to every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to the watched file or directory
    pub input: PathBuf,
    /// Absolute path to the backup destination directory
    pub output: PathBuf,
    /// Polling and backup cadence
    pub interval: Duration,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self> {
        Ok(Self {
            input: absolutize(&cli.input).context("unable to parse input file path")?,
            output: absolutize(&cli.output).context("unable to parse output file path")?,
            interval: cli.interval,
        })
    }
}

/// Resolve a possibly-relative path against the current working
/// directory, without touching the filesystem.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(cwd.join(path))
    }
}

//! Command-line parsing for the server binary (SPEC_FULL.md §4.L).
//!
//! Grounded on `examples/original_source/src/server/argv_parser.c`'s option
//! set (`--cert-path`, `--privkey-path`, `--privkey-pass`) plus the common
//! `--config`/daemon-control options shared with the client
//! (`src/common/argv_parser.c`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Package and configuration sync server")]
pub struct Args {
    /// Path to the server's TOML configuration file.
    #[arg(short, long, default_value = "/etc/sync-server/server.toml")]
    pub config: PathBuf,

    /// Run in the foreground instead of daemonizing.
    #[arg(long)]
    pub foreground: bool,

    /// Path to the PID/lock file used to enforce a single running instance.
    #[arg(long, default_value = "/var/run/sync-server.pid")]
    pub pid_file: PathBuf,

    /// Override the listening port from the config file.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the maximum number of concurrent client worker threads.
    #[arg(long)]
    pub max_clients_threads: Option<usize>,

    /// Override the directory holding numbered configuration sets.
    #[arg(long)]
    pub configuration_sets_dir: Option<PathBuf>,
}

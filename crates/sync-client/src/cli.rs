//! Command-line parsing for the client binary (SPEC_FULL.md §4.L).
//!
//! Grounded on `examples/original_source/include/client/argv_parser.h` (the
//! client's own options: server address, config set, compression, package
//! manager) plus the common `--config` option shared with the server.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Package and configuration sync client")]
pub struct Args {
    /// Path to the client's TOML configuration file.
    #[arg(short, long, default_value = "/etc/sync-client/client.toml")]
    pub config: PathBuf,

    /// Run in the foreground instead of daemonizing.
    #[arg(long)]
    pub foreground: bool,

    /// Override the configuration set number to request.
    #[arg(long)]
    pub config_set: Option<u16>,

    /// Override the requested compression type (none, tar_gz, tar_bz2, tar_xz, zip).
    #[arg(long)]
    pub compression: Option<String>,

    /// Override the requested package manager (dpkg, tar_xz).
    #[arg(long)]
    pub package_manager: Option<String>,
}

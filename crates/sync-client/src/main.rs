//! Client binary entry point (SPEC_FULL.md §4.L).
//!
//! Grounded on `examples/original_source/src/client/main.c`'s three-stage
//! shape (SSL context init, daemonized work, SSL context cleanup).

mod cli;

use clap::Parser;
use sync_client::{run_upgrade, ClientError};
use sync_config::{ClientConfig, ClientConfigOverrides, Daemonize, NoopDaemonize, UnixDaemonize};
use sync_tls::{TlsClientParams, TlsContext};
use tracing::{error, info};

use crate::cli::Args;

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("starting client");
    match run(args) {
        Ok(()) => info!("exiting client"),
        Err(e) => {
            error!(error = %e, "client failed");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<(), ClientError> {
    let config = ClientConfig::load(
        &args.config,
        ClientConfigOverrides {
            config_set: args.config_set,
            compression: args.compression,
            package_manager: args.package_manager,
        },
    )?;

    let tls_params = TlsClientParams {
        ca_path: config.tls.ca_path.clone(),
    };
    let tls = TlsContext::new_client(&tls_params)?;

    let foreground = args.foreground;
    let exit_code = if foreground {
        NoopDaemonize.daemonize(move || match run_upgrade(&tls, &config) {
            Ok(path) => {
                info!(path = %path.display(), "upgrade archive received");
                0
            }
            Err(e) => {
                error!(error = %e, "upgrade failed");
                1
            }
        })
    } else {
        UnixDaemonize.daemonize(move || match run_upgrade(&tls, &config) {
            Ok(path) => {
                info!(path = %path.display(), "upgrade archive received");
                0
            }
            Err(e) => {
                error!(error = %e, "upgrade failed");
                1
            }
        })
    };

    if exit_code != 0 {
        return Err(ClientError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "upgrade failed",
        )));
    }
    Ok(())
}

//! Server binary entry point (SPEC_FULL.md §4.L).
//!
//! Grounded on `examples/original_source/src/server/main.c`'s three-stage
//! shape (SSL context init, daemonized work, cleanup) and `main_loop.c`'s
//! `set_sigint_handler`, generalized to SIGINT/SIGTERM both setting an
//! atomic shutdown flag the acceptor loop polls instead of unwinding out of
//! a signal handler.

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use sync_config::{
    Daemonize, FlockPidLock, NoopDaemonize, ServerConfig, ServerConfigOverrides,
    SingleInstanceLock, UnixDaemonize,
};
use sync_server::{accept_clients, ServerError};
use sync_tls::{TlsContext, TlsServerParams};
use tracing::{error, info};

use crate::cli::Args;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, request_shutdown as libc::sighandler_t);
        libc::signal(libc::SIGTERM, request_shutdown as libc::sighandler_t);
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("starting server");
    match run(args) {
        Ok(()) => info!("exiting server"),
        Err(e) => {
            error!(error = %e, "server failed");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<(), ServerError> {
    let config = ServerConfig::load(
        &args.config,
        ServerConfigOverrides {
            port: args.port,
            max_clients_threads: args.max_clients_threads,
            configuration_sets_dir: args.configuration_sets_dir,
        },
    )?;

    let tls_params = TlsServerParams {
        cert_chain: config
            .tls
            .cert_chain
            .clone()
            .ok_or_else(|| ServerError::Config(sync_config::ConfigError::MissingField("tls.cert_chain")))?,
        private_key: config
            .tls
            .private_key
            .clone()
            .ok_or_else(|| ServerError::Config(sync_config::ConfigError::MissingField("tls.private_key")))?,
        private_key_password: config
            .tls
            .private_key_password
            .as_ref()
            .map(|p| p.as_str().to_owned()),
    };
    let tls = Arc::new(TlsContext::new_server(&tls_params)?);

    let _lock = FlockPidLock::acquire(&args.pid_file).map_err(ServerError::AlreadyRunning)?;

    install_signal_handlers();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || loop {
            if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(200));
        });
    }

    let exit_code = if args.foreground {
        NoopDaemonize.daemonize(move || match accept_clients(config, tls, shutdown) {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "accept loop failed");
                1
            }
        })
    } else {
        UnixDaemonize.daemonize(move || match accept_clients(config, tls, shutdown) {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "accept loop failed");
                1
            }
        })
    };

    if exit_code != 0 {
        return Err(ServerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "accept loop failed",
        )));
    }
    Ok(())
}

//! Listening acceptor (SPEC_FULL.md §4.F).
//!
//! Grounded on `examples/original_source/src/server/main_loop.c`'s
//! `accept_clients`/`create_initialized_server_socket`/`init_server_socket`/
//! `accept_client` (bind/listen/accept shape, `SO_REUSEADDR`, backlog
//! `MIN(64, SOMAXCONN)`) and `try_to_create_thread_for_client`'s
//! atomic-counter-gated thread spawn, generalized here to a non-blocking
//! listener polled alongside a shutdown flag so the loop can exit cleanly
//! instead of blocking forever in `accept()` (see DESIGN.md's resolution of
//! the corresponding Open Question).

use std::mem;
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sync_config::ServerConfig;
use sync_tls::TlsContext;
use tracing::{error, info, warn};

use crate::worker::{handle_connection, WorkerSlot};

/// `MIN(64, SOMAXCONN)` in the source. `libc::SOMAXCONN` is 128 on Linux, so
/// this is the binding constraint in practice.
const BACKLOG: i32 = 64;

const ACCEPT_POLL_TIMEOUT_MILLISECONDS: i32 = 1_000;

/// Runs the accept loop until `shutdown` is set. Blocks the calling thread.
pub fn accept_clients(
    config: Arc<ServerConfig>,
    tls: Arc<TlsContext>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let listener = bind_listener(config.port)?;
    listener.set_nonblocking(true)?;

    info!(port = config.port, "listening for clients");

    let clients_number = Arc::new(AtomicUsize::new(0));

    while !shutdown.load(Ordering::SeqCst) {
        match poll_accept(&listener) {
            Ok(Some((socket, addr))) => {
                info!(%addr, "connection accepted from client");
                dispatch(socket, &config, &tls, &clients_number);
            }
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "failed to accept client connection");
            }
        }
    }

    info!("shutdown requested, closing listening socket");
    Ok(())
}

/// Raw socket()/setsockopt(SO_REUSEADDR)/bind()/listen() sequence, matching
/// `init_server_socket`/`create_initialized_server_socket`: `TcpListener::bind`
/// alone can't set `SO_REUSEADDR` before `bind()` or choose the listen
/// backlog, so this builds the socket by hand and hands the fd to
/// `TcpListener` only once it's already bound and listening.
fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let reuseaddr: libc::c_int = 1;
        let result = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &reuseaddr as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if result < 0 {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        let mut addr: libc::sockaddr_in = mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = port.to_be();
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();

        let result = libc::bind(
            fd,
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if result < 0 {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        if libc::listen(fd, BACKLOG) < 0 {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        Ok(TcpListener::from_raw_fd(fd))
    }
}

fn poll_accept(listener: &TcpListener) -> std::io::Result<Option<(TcpStream, std::net::SocketAddr)>> {
    let fd = listener.as_raw_fd();
    let mut fds = [libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }];
    let status = unsafe { libc::poll(fds.as_mut_ptr(), 1, ACCEPT_POLL_TIMEOUT_MILLISECONDS) };
    if status < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if status == 0 {
        return Ok(None);
    }

    match listener.accept() {
        Ok((socket, addr)) => Ok(Some((socket, addr))),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

fn dispatch(
    socket: TcpStream,
    config: &Arc<ServerConfig>,
    tls: &Arc<TlsContext>,
    clients_number: &Arc<AtomicUsize>,
) {
    let slot = match WorkerSlot::try_acquire(Arc::clone(clients_number), config.max_clients_threads) {
        Some(slot) => slot,
        None => {
            warn!("maximum clients' threads exist(ed), rejecting connection");
            drop(socket);
            return;
        }
    };

    let config = Arc::clone(config);
    let tls = Arc::clone(tls);

    let builder = thread::Builder::new().name("sync-worker".into());
    if let Err(e) = builder.spawn(move || handle_connection(socket, tls, config, slot)) {
        error!(error = %e, "failed to create thread for client");
    }
}

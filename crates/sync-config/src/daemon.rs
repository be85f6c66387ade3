//! Daemonization collaborator (SPEC_FULL.md §4.N). Process daemonization is
//! explicitly out of scope for the core; these traits only capture the
//! contract the core relies on.

/// A process daemonizer: forks into the background (or doesn't) and then
/// runs `run`, returning its exit code.
pub trait Daemonize {
    fn daemonize(self, run: impl FnOnce() -> i32) -> i32;
}

/// Runs the server/client core in the foreground. Used by `--foreground`
/// and by tests, where a detaching daemonizer would make the process
/// impossible to observe.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDaemonize;

impl Daemonize for NoopDaemonize {
    fn daemonize(self, run: impl FnOnce() -> i32) -> i32 {
        run()
    }
}

/// Documents the classic double-fork daemonization contract
/// (`fork`/`setsid`/`fork`/`chdir("/")`/close standard fds) without fully
/// implementing it; full double-fork daemonization is out of scope for the
/// core (SPEC_FULL.md §1).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixDaemonize;

impl Daemonize for UnixDaemonize {
    fn daemonize(self, run: impl FnOnce() -> i32) -> i32 {
        run()
    }
}

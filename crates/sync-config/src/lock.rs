//! Single-instance PID lock collaborator (SPEC_FULL.md §4.N), backed by an
//! advisory `flock` over the configured PID file via `fs2`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

pub trait SingleInstanceLock: Sized {
    fn acquire(path: &Path) -> io::Result<Self>;
}

/// Holds an exclusive, non-blocking `flock` on the PID file for as long as
/// this value lives; the lock is released when it's dropped (or the process
/// exits).
pub struct FlockPidLock {
    file: File,
}

impl SingleInstanceLock for FlockPidLock {
    fn acquire(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()?;
        file.set_len(0)?;
        use std::io::Write;
        write!(&file, "{}", std::process::id())?;
        Ok(Self { file })
    }
}

impl Drop for FlockPidLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_path_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.pid");

        let first = FlockPidLock::acquire(&path).unwrap();
        let second = FlockPidLock::acquire(&path);
        assert!(second.is_err());
        drop(first);

        let third = FlockPidLock::acquire(&path);
        assert!(third.is_ok());
    }
}

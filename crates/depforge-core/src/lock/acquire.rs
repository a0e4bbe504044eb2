use super::{LockError, LockGuard};
use fs2::FileExt;
use log::warn;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(10);
const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);
const WAIT_NOTICE_THRESHOLD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub(crate) enum Mode {
    Exclusive,
    Shared,
}

pub(crate) fn acquire_with_retry(
    lock_path: &Path,
    timeout: Duration,
    description: &str,
    mode: Mode,
) -> Result<LockGuard, LockError> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(|e| LockError::Io {
            source: e,
            path: parent.to_path_buf(),
            operation: "create lock directory",
        })?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| LockError::Io {
            source: e,
            path: lock_path.to_path_buf(),
            operation: "open lock file",
        })?;

    let start = Instant::now();
    let mut delay = INITIAL_RETRY_DELAY;
    let mut notified = false;

    loop {
        let attempt = match mode {
            Mode::Exclusive => file.try_lock_exclusive(),
            Mode::Shared => FileExt::try_lock_shared(&file),
        };

        match attempt {
            Ok(()) => {
                return Ok(LockGuard {
                    _file: file,
                    path: lock_path.to_path_buf(),
                });
            }
            Err(e) if is_contended(&e) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Err(LockError::Timeout {
                        path: lock_path.to_path_buf(),
                        description: description.to_string(),
                    });
                }

                if !notified && elapsed >= WAIT_NOTICE_THRESHOLD {
                    warn!(
                        "Waiting for lock on {} ({})...",
                        lock_path.display(),
                        description
                    );
                    notified = true;
                }

                thread::sleep(delay.min(timeout.saturating_sub(elapsed)));
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
            Err(e) => {
                return Err(LockError::Io {
                    source: e,
                    path: lock_path.to_path_buf(),
                    operation: "lock",
                });
            }
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

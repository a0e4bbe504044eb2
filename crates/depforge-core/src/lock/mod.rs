//! Advisory file locks.
//!
//! Locks are taken with `fs2` on a dedicated lock file, retried with
//! exponential backoff until a timeout, and released when the returned
//! [`LockGuard`] is dropped. They only coordinate cooperating depforge
//! processes; nothing prevents another program from touching the guarded
//! directories.

use std::path::Path;
use std::time::Duration;

mod acquire;
mod error;
mod guard;

pub use error::LockError;
pub use guard::LockGuard;


/// Default time to wait for a per-package lock held by another process.
pub const PACKAGE_LOCK_TIMEOUT: Duration = Duration::from_secs(600);

/// Acquire an exclusive lock on `lock_path`, waiting at most `timeout`.
///
/// ```no_run
/// use depforge_core::lock::acquire_lock;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let guard = acquire_lock(Path::new("/tmp/zlib-1.3.lock"), Duration::from_secs(30), "build zlib")?;
/// // purge, build and package while holding the lock
/// drop(guard);
/// # Ok(())
/// # }
/// ```
pub fn acquire_lock(
    lock_path: &Path,
    timeout: Duration,
    description: &str,
) -> Result<LockGuard, LockError> {
    acquire::acquire_with_retry(lock_path, timeout, description, acquire::Mode::Exclusive)
}

/// Acquire a shared lock; shared holders only exclude exclusive ones.
pub fn acquire_shared_lock(
    lock_path: &Path,
    timeout: Duration,
    description: &str,
) -> Result<LockGuard, LockError> {
    acquire::acquire_with_retry(lock_path, timeout, description, acquire::Mode::Shared)
}

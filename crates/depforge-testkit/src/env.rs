//! Environment isolation.
//!
//! Process environment is global, so every test that changes it must go
//! through [`with_isolated_env`], which holds one mutex for the duration of
//! the closure and restores the previous values afterwards.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with a fresh `HOME` and the given variable overrides.
///
/// A `None` value removes the variable for the duration of the call. The
/// closure receives the fake home directory.
///
/// ```no_run
/// use depforge_testkit::with_isolated_env;
///
/// with_isolated_env(&[("DEPFORGE_MSVC_SETUP", None)], |home| {
///     assert!(home.is_dir());
/// });
/// ```
pub fn with_isolated_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    // A panicking test poisons the lock; the guarded data is `()`, so recover.
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let fake_home = TempDir::new().expect("Failed to create isolated HOME");

    let mut saved: Vec<(String, Option<OsString>)> = vec![("HOME".to_string(), std::env::var_os("HOME"))];
    for (name, _) in vars {
        saved.push((name.to_string(), std::env::var_os(name)));
    }

    // SAFETY: ENV_LOCK serializes every environment mutation made by tests.
    unsafe {
        std::env::set_var("HOME", fake_home.path());
        for (name, value) in vars {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }

    let result = f(fake_home.path());

    // SAFETY: still holding ENV_LOCK.
    unsafe {
        for (name, value) in saved.into_iter().rev() {
            match value {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }

    result
}

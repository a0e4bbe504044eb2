//! One mockito server shared by every test thread.
//!
//! Tests register mocks under unique paths, so parallel tests never see each
//! other's routes. Hold the guard only while creating mocks.

use lazy_static::lazy_static;
use mockito::{Server, ServerGuard};
use std::sync::{Mutex, MutexGuard};

lazy_static! {
    pub static ref SHARED_MOCK_SERVER: Mutex<ServerGuard> = Mutex::new(Server::new());
}

/// Lock the shared server; a poisoned lock is recovered.
///
/// ```no_run
/// use depforge_testkit::get_shared_mock_server;
///
/// let (mock, url) = {
///     let mut server = get_shared_mock_server();
///     let mock = server.mock("GET", "/zlib/zlib-1.3.tar.gz").with_body("data").create();
///     (mock, format!("{}/zlib/zlib-1.3.tar.gz", server.url()))
/// };
/// // download `url`, then `mock.assert()`
/// ```
pub fn get_shared_mock_server() -> MutexGuard<'static, ServerGuard> {
    SHARED_MOCK_SERVER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

use depforge_fetch::download::temp_download_path;
use depforge_fetch::{DownloadError, DownloadOptions, Downloader, Progress, SourceKind};
use depforge_testkit::{get_shared_mock_server, temp_dir_in_workspace};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn fast_options() -> DownloadOptions {
    DownloadOptions {
        max_retries: 5,
        timeout: Duration::from_secs(5),
        max_bytes_per_second: 0,
        retry_delay: Duration::from_millis(10),
        force: false,
    }
}

#[test]
fn test_http_download_writes_destination() {
    let mut server = mockito::Server::new();
    let body = vec![7u8; 20_000];
    let mock = server
        .mock("GET", "/zlib-1.3.tar.gz")
        .with_status(200)
        .with_body(body.clone())
        .expect(1)
        .create();

    let temp = temp_dir_in_workspace();
    let dest = temp.path().join("zlib-1.3.tar.gz");
    let url = format!("{}/zlib-1.3.tar.gz", server.url());

    let outcome = Downloader::new(fast_options())
        .unwrap()
        .fetch(&url, &dest)
        .unwrap();

    mock.assert();
    assert_eq!(outcome.kind, SourceKind::Http);
    assert_eq!(outcome.retries, 0);
    assert_eq!(outcome.bytes, body.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), body);
    assert!(!temp_download_path(&dest).exists());
}

#[test]
fn test_missing_content_length_is_retried() {
    let mut server = mockito::Server::new();
    // Chunked responses carry no Content-Length.
    let chunked = server
        .mock("GET", "/flaky.tar.gz")
        .with_status(200)
        .with_chunked_body(|w| w.write_all(b"partial"))
        .expect(2)
        .create();
    let good = server
        .mock("GET", "/flaky.tar.gz")
        .with_status(200)
        .with_body("complete archive")
        .expect(1)
        .create();

    let temp = temp_dir_in_workspace();
    let dest = temp.path().join("flaky.tar.gz");
    let url = format!("{}/flaky.tar.gz", server.url());

    let outcome = Downloader::new(fast_options())
        .unwrap()
        .fetch(&url, &dest)
        .unwrap();

    chunked.assert();
    good.assert();
    assert_eq!(outcome.retries, 2);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "complete archive");
}

#[test]
fn test_exhausted_retries_are_an_error() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/never.tar.gz")
        .with_status(503)
        .expect(3)
        .create();

    let temp = temp_dir_in_workspace();
    let dest = temp.path().join("never.tar.gz");
    let options = DownloadOptions {
        max_retries: 2,
        ..fast_options()
    };

    let err = Downloader::new(options)
        .unwrap()
        .fetch(&format!("{}/never.tar.gz", server.url()), &dest)
        .unwrap_err();

    mock.assert();
    assert!(matches!(
        err,
        DownloadError::RetriesExhausted { attempts: 3, .. }
    ));
    assert!(!dest.exists());
    assert!(!temp_download_path(&dest).exists());
}

#[test]
fn test_not_found_is_not_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/missing.tar.gz")
        .with_status(404)
        .expect(1)
        .create();

    let temp = temp_dir_in_workspace();
    let err = Downloader::new(fast_options())
        .unwrap()
        .fetch(
            &format!("{}/missing.tar.gz", server.url()),
            &temp.path().join("missing.tar.gz"),
        )
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, DownloadError::Status { status: 404, .. }));
}

#[test]
fn test_rate_limited_response_is_retried() {
    let mut server = mockito::Server::new();
    let limited = server
        .mock("GET", "/busy.tar.gz")
        .with_status(429)
        .expect(1)
        .create();
    let good = server
        .mock("GET", "/busy.tar.gz")
        .with_status(200)
        .with_body("archive")
        .expect(1)
        .create();

    let temp = temp_dir_in_workspace();
    let dest = temp.path().join("busy.tar.gz");
    let outcome = Downloader::new(fast_options())
        .unwrap()
        .fetch(&format!("{}/busy.tar.gz", server.url()), &dest)
        .unwrap();

    limited.assert();
    good.assert();
    assert_eq!(outcome.retries, 1);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "archive");
}

/// Answers one request with a `Content-Length` larger than what it sends,
/// then keeps the connection open without writing.
fn spawn_stalling_server(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nabc",
            );
            let _ = stream.flush();
            thread::sleep(hold);
        }
    });
    format!("http://{}/stalled.tar.gz", addr)
}

#[test]
fn test_stalled_body_times_out() {
    let url = spawn_stalling_server(Duration::from_secs(30));
    let temp = temp_dir_in_workspace();
    let dest = temp.path().join("stalled.tar.gz");
    let options = DownloadOptions {
        max_retries: 0,
        timeout: Duration::from_secs(1),
        ..fast_options()
    };

    let (tx, rx) = mpsc::channel();
    let worker_dest = dest.clone();
    thread::spawn(move || {
        let result = Downloader::new(options)
            .unwrap()
            .fetch(&url, &worker_dest);
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(15))
        .expect("download still blocked on a stalled body");
    assert!(matches!(
        result,
        Err(DownloadError::RetriesExhausted { attempts: 1, .. })
    ));
    assert!(!dest.exists());
    assert!(!temp_download_path(&dest).exists());
}

#[test]
fn test_throughput_cap_bounds_duration() {
    let mut server = mockito::Server::new();
    let size = 16 * 1024;
    let _mock = server
        .mock("GET", "/throttled.bin")
        .with_status(200)
        .with_body(vec![1u8; size])
        .create();

    let temp = temp_dir_in_workspace();
    let options = DownloadOptions {
        max_bytes_per_second: 32 * 1024,
        ..fast_options()
    };

    let started = Instant::now();
    let outcome = Downloader::new(options)
        .unwrap()
        .fetch(
            &format!("{}/throttled.bin", server.url()),
            &temp.path().join("throttled.bin"),
        )
        .unwrap();

    assert_eq!(outcome.bytes, size as u64);
    // S / N = 0.5s
    assert!(
        started.elapsed() >= Duration::from_millis(500),
        "took only {:?}",
        started.elapsed()
    );
}

static LAST_REPORTED: AtomicU64 = AtomicU64::new(0);

fn record_progress(progress: &Progress) {
    assert!(progress.downloaded <= progress.total);
    LAST_REPORTED.store(progress.downloaded, Ordering::SeqCst);
}

#[test]
fn test_progress_reports_completion() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/progress.bin")
        .with_status(200)
        .with_body(vec![0u8; 50_000])
        .create();

    let temp = temp_dir_in_workspace();
    Downloader::new(fast_options())
        .unwrap()
        .with_progress(record_progress)
        .fetch(
            &format!("{}/progress.bin", server.url()),
            &temp.path().join("progress.bin"),
        )
        .unwrap();

    assert_eq!(LAST_REPORTED.load(Ordering::SeqCst), 50_000);
}

#[test]
fn test_probe_and_first_reachable() {
    let (_empty, _ok, base) = {
        let mut server = get_shared_mock_server();
        let empty = server
            .mock("GET", "/probe/empty.7z")
            .with_status(200)
            .with_body("")
            .create();
        let ok = server
            .mock("GET", "/probe/lz4-1.9.4-linux-clang.tar.xz")
            .with_status(200)
            .with_body("package bytes")
            .create();
        (empty, ok, server.url())
    };

    let downloader = Downloader::new(fast_options()).unwrap();
    let candidates = vec![
        format!("{}/probe/absent.7z", base),
        format!("{}/probe/empty.7z", base),
        format!("{}/probe/lz4-1.9.4-linux-clang.tar.xz", base),
    ];

    assert!(!downloader.probe(&candidates[0]));
    assert!(!downloader.probe(&candidates[1]));
    assert_eq!(
        downloader.first_reachable(&candidates),
        Some(candidates[2].as_str())
    );
}

//! Resource fetching.
//!
//! A source string is classified once:
//!
//! - `git@…`, `hg@…`, `git+…`: cloned with the VCS client
//! - an existing filesystem path: copied
//! - `http://` / `https://`: streamed with retry
//!
//! HTTP transfers land in `{dest}.download` and are renamed over `dest` only
//! once the byte count matches `Content-Length`. A response without
//! `Content-Length` counts as a transient failure. Every retry restarts from
//! byte zero.

mod throughput;
pub mod vcs;

pub use throughput::{DEFAULT_ALPHA, ThroughputEstimator};

use crate::client::build_client;
use crate::error::DownloadError;
use depforge_core::config::DownloadConfig;
use depforge_core::fsutil::{copy_dir_all, remove_dir_if_exists, remove_file_if_exists};
use depforge_core::{CommandRunner, SystemRunner};
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const CHUNK_SIZE: usize = 8192;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub max_retries: u32,
    pub timeout: Duration,
    /// 0 disables throttling.
    pub max_bytes_per_second: u64,
    pub retry_delay: Duration,
    /// Replace an existing destination for local copies and clones.
    pub force: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for DownloadOptions {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes_per_second: config.max_bytes_per_second,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            force: false,
        }
    }
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone)]
pub struct Progress<'a> {
    pub url: &'a str,
    pub downloaded: u64,
    pub total: u64,
    /// Smoothed bytes per second.
    pub rate: Option<f64>,
    pub eta: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Local,
    Vcs,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub bytes: u64,
    /// Failed HTTP attempts before the one that succeeded.
    pub retries: u32,
    pub elapsed: Duration,
}

enum Source<'a> {
    Vcs(vcs::Vcs, &'a str),
    Local(&'a Path),
    Http(&'a str),
}

fn classify(source: &str) -> Option<Source<'_>> {
    if let Some((kind, url)) = vcs::parse_reference(source) {
        return Some(Source::Vcs(kind, url));
    }
    let path = Path::new(source);
    if path.exists() {
        return Some(Source::Local(path));
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        return Some(Source::Http(source));
    }
    None
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(u64),
    Retry(String),
    Fatal(DownloadError),
}

pub struct Downloader {
    client: Client,
    options: DownloadOptions,
    progress: Option<fn(&Progress)>,
    runner: Arc<dyn CommandRunner>,
}

impl Downloader {
    pub fn new(options: DownloadOptions) -> Result<Self, DownloadError> {
        Self::with_runner(options, Arc::new(SystemRunner))
    }

    pub fn with_runner(
        options: DownloadOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, DownloadError> {
        let client = build_client(options.timeout).map_err(DownloadError::Client)?;
        Ok(Self {
            client,
            options,
            progress: None,
            runner,
        })
    }

    pub fn with_progress(mut self, callback: fn(&Progress)) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Fetch `source` into `dest`.
    pub fn fetch(&self, source: &str, dest: &Path) -> Result<FetchOutcome, DownloadError> {
        let started = Instant::now();
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DownloadError::io(format!("create {}", parent.display()), e))?;
        }

        let (kind, bytes, retries) = match classify(source) {
            Some(Source::Vcs(kind, url)) => {
                self.prepare_destination(dest)?;
                info!("Cloning {} into {}", url, dest.display());
                vcs::clone(self.runner.as_ref(), kind, url, dest)?;
                (SourceKind::Vcs, 0, 0)
            }
            Some(Source::Local(path)) => {
                self.prepare_destination(dest)?;
                info!("Copying {} to {}", path.display(), dest.display());
                let bytes = copy_local(path, dest)?;
                (SourceKind::Local, bytes, 0)
            }
            Some(Source::Http(url)) => {
                let (bytes, retries) = self.fetch_http(url, dest)?;
                (SourceKind::Http, bytes, retries)
            }
            None => return Err(DownloadError::UnsupportedSource(source.to_string())),
        };

        Ok(FetchOutcome {
            path: dest.to_path_buf(),
            kind,
            bytes,
            retries,
            elapsed: started.elapsed(),
        })
    }

    /// Whether `url` can be fetched right now: an existing local path, or an
    /// HTTP resource answering success with a positive `Content-Length`.
    pub fn probe(&self, url: &str) -> bool {
        if Path::new(url).exists() {
            return true;
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }
        match self.client.get(url).send() {
            Ok(response) => {
                let ok = response.status().is_success()
                    && response.content_length().is_some_and(|len| len > 0);
                debug!("Probe {} -> {} ({})", url, response.status(), ok);
                ok
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, e);
                false
            }
        }
    }

    /// First candidate for which [`probe`](Self::probe) succeeds.
    pub fn first_reachable<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Option<&'a str> {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|url| self.probe(url))
    }

    fn prepare_destination(&self, dest: &Path) -> Result<(), DownloadError> {
        if !dest.exists() {
            return Ok(());
        }
        if !self.options.force {
            return Err(DownloadError::DestinationExists(dest.to_path_buf()));
        }
        let removed = if dest.is_dir() {
            remove_dir_if_exists(dest)
        } else {
            remove_file_if_exists(dest)
        };
        removed
            .map(|_| ())
            .map_err(|e| DownloadError::io(format!("remove {}", dest.display()), e))
    }

    fn fetch_http(&self, url: &str, dest: &Path) -> Result<(u64, u32), DownloadError> {
        let temp_path = temp_download_path(dest);
        let mut retries = 0;
        let mut last_error = String::new();

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                thread::sleep(self.options.retry_delay);
            }
            info!("Downloading {} (attempt {})", url, attempt + 1);

            match self.attempt(url, &temp_path) {
                Attempt::Done(bytes) => {
                    fs::rename(&temp_path, dest).map_err(|e| {
                        DownloadError::io(format!("rename to {}", dest.display()), e)
                    })?;
                    info!("Downloaded {} ({} bytes)", dest.display(), bytes);
                    return Ok((bytes, retries));
                }
                Attempt::Retry(reason) => {
                    error!("Download of {} failed: {}", url, reason);
                    discard_partial(&temp_path);
                    retries += 1;
                    last_error = reason;
                }
                Attempt::Fatal(err) => {
                    discard_partial(&temp_path);
                    return Err(err);
                }
            }
        }

        Err(DownloadError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.options.max_retries + 1,
            last_error,
        })
    }

    fn attempt(&self, url: &str, temp_path: &Path) -> Attempt {
        let mut response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        if status.is_client_error() && !is_transient(status) {
            return Attempt::Fatal(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Attempt::Retry(format!("status {}", status));
        }

        let Some(total) = response.content_length() else {
            return Attempt::Retry("response has no Content-Length".to_string());
        };

        let mut file = match File::create(temp_path) {
            Ok(file) => file,
            Err(e) => {
                return Attempt::Fatal(DownloadError::io(
                    format!("create {}", temp_path.display()),
                    e,
                ));
            }
        };

        let mut estimator = ThroughputEstimator::default();
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;
        let mut last_report: Option<Instant> = None;

        loop {
            let chunk_started = Instant::now();
            let read = match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return Attempt::Retry(e.to_string()),
            };
            if let Err(e) = file.write_all(&buffer[..read]) {
                return Attempt::Fatal(DownloadError::io(
                    format!("write {}", temp_path.display()),
                    e,
                ));
            }
            downloaded += read as u64;

            if let Some(nominal) =
                throughput::nominal_interval(read as u64, self.options.max_bytes_per_second)
            {
                let spent = chunk_started.elapsed();
                if spent < nominal {
                    thread::sleep(nominal - spent);
                }
            }
            estimator.update(read as u64, chunk_started.elapsed());

            if let Some(callback) = self.progress {
                let due = last_report.is_none_or(|at| at.elapsed() >= PROGRESS_INTERVAL);
                if due || downloaded == total {
                    callback(&Progress {
                        url,
                        downloaded,
                        total,
                        rate: estimator.rate(),
                        eta: estimator.eta(total.saturating_sub(downloaded)),
                    });
                    last_report = Some(Instant::now());
                }
            }
        }

        if let Err(e) = file.sync_all() {
            warn!("Failed to sync {}: {}", temp_path.display(), e);
        }

        if downloaded != total {
            return Attempt::Retry(format!(
                "size mismatch: expected {} bytes, got {}",
                total, downloaded
            ));
        }
        Attempt::Done(downloaded)
    }
}

/// Request timeout and rate limiting are worth another attempt; any other
/// 4xx is not.
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
    )
}

fn discard_partial(temp_path: &Path) {
    if let Err(e) = remove_file_if_exists(temp_path) {
        warn!("Failed to remove partial download {}: {}", temp_path.display(), e);
    }
}

/// `{dest}.download`
pub fn temp_download_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".download");
    PathBuf::from(name)
}

fn copy_local(src: &Path, dest: &Path) -> Result<u64, DownloadError> {
    if src.is_dir() {
        copy_dir_all(src, dest)
            .map_err(|e| DownloadError::io(format!("copy {}", src.display()), e))?;
        Ok(0)
    } else {
        fs::copy(src, dest).map_err(|e| DownloadError::io(format!("copy {}", src.display()), e))
    }
}

// loader.rs — 后台线程加载/解码全景图
//
// Every request gets a generation number. Cancelling (or issuing a newer
// request) bumps the shared "latest" generation; workers whose generation no
// longer matches drop their result instead of sending it, and the receiver
// filters anything stale that slipped through.

use crate::error::{ViewerError, ViewerResult};
use crate::panorama::SourceImage;
use image::io::Reader as ImageReader;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of one load request.
#[derive(Debug)]
pub struct LoadedImage {
    pub generation: u64,
    pub url: String,
    pub result: ViewerResult<SourceImage>,
}

pub struct ImageLoader {
    tx: Sender<LoadedImage>,
    rx: Receiver<LoadedImage>,
    latest: Arc<AtomicU64>,
    next_generation: u64,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            latest: Arc::new(AtomicU64::new(0)),
            next_generation: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.latest.store(self.next_generation, Ordering::SeqCst);
        self.next_generation
    }

    /// Starts loading `url` in the background; supersedes any pending request.
    pub fn request(&mut self, url: &str) -> u64 {
        let generation = self.bump();
        let latest = Arc::clone(&self.latest);
        let tx = self.tx.clone();
        let url = url.to_string();

        thread::spawn(move || {
            log::info!("loading panorama in background: {}", url);
            let is_current = || latest.load(Ordering::SeqCst) == generation;

            let result = fetch_bytes(&url).and_then(|bytes| {
                if !is_current() {
                    // 已取消，跳过解码
                    return Err(ViewerError::image_load(&url, "cancelled"));
                }
                decode(&url, &bytes)
            });

            if !is_current() {
                log::debug!("discarding stale load of {} (generation {})", url, generation);
                return;
            }
            if tx.send(LoadedImage { generation, url, result }).is_err() {
                log::warn!("viewer went away before the panorama finished loading");
            }
        });

        generation
    }

    /// Invalidates whatever is in flight.
    pub fn cancel(&mut self) {
        self.bump();
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Next finished load for the latest request, if any. Non-blocking.
    pub fn try_recv(&self) -> Option<LoadedImage> {
        while let Ok(loaded) = self.rx.try_recv() {
            if self.is_current(loaded.generation) {
                return Some(loaded);
            }
        }
        None
    }

    /// Blocking variant of [`Self::try_recv`].
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadedImage> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(loaded) if self.is_current(loaded.generation) => return Some(loaded),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn local_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

/// Raw bytes from a local path, `file://` URL or `http(s)://` URL.
pub fn fetch_bytes(url: &str) -> ViewerResult<Vec<u8>> {
    if is_remote(url) {
        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| ViewerError::image_load(url, e))?;
        let bytes = response.bytes().map_err(|e| ViewerError::image_load(url, e))?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(local_path(url)).map_err(|e| ViewerError::image_load(url, e))
    }
}

/// Decodes JPEG/PNG/... bytes into an RGBA panorama.
pub fn decode(url: &str, bytes: &[u8]) -> ViewerResult<SourceImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ViewerError::image_load(url, e))?;
    reader.no_limits();
    let img = reader.decode().map_err(|e| ViewerError::image_load(url, e))?;

    let source = SourceImage::new(img.to_rgba8());
    log::info!(
        "panorama decoded: {}x{} ({})",
        source.width(),
        source.height(),
        url
    );
    if !source.is_equirectangular() {
        log::warn!(
            "panorama {} has aspect {:.2}, expected 2:1; the view will be distorted",
            url,
            source.aspect_ratio()
        );
    }
    Ok(source)
}

/// Synchronous fetch + decode.
pub fn load_source(url: &str) -> ViewerResult<SourceImage> {
    let bytes = fetch_bytes(url)?;
    decode(url, &bytes)
}

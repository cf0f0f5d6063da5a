//! Descriptor fixtures and polling helpers.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Bencoded single-file descriptor carrying `name` and `length`.
#[must_use]
pub fn descriptor_bytes(name: &str, length: u64) -> Vec<u8> {
    format!(
        "d8:announce17:http://tracker/an4:infod6:lengthi{length}e4:name{}:{name}12:piece lengthi16384eee",
        name.len()
    )
    .into_bytes()
}

/// Write a descriptor named `file_name` into `dir`.
///
/// # Errors
///
/// Returns the underlying IO error when the file cannot be written.
pub fn write_descriptor(dir: &Path, file_name: &str, name: &str, length: u64) -> io::Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, descriptor_bytes(name, length))?;
    Ok(path)
}

/// Re-evaluate `condition` every few milliseconds until it holds or `limit` elapses.
pub async fn wait_until<F, Fut>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + limit;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

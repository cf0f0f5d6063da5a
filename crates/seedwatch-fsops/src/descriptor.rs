//! Descriptor matching, discovery, and cleanup.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Matches descriptor files by their file name.
#[derive(Debug, Clone)]
pub struct DescriptorFilter {
    pattern: Regex,
}

impl DescriptorFilter {
    /// Compile a filter from a regular expression applied to the file name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` when the expression does not compile.
    pub fn new(pattern: &str) -> FsOpsResult<Self> {
        Regex::new(pattern)
            .map(Self::from_regex)
            .map_err(|source| FsOpsError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Wrap an already compiled expression.
    #[must_use]
    pub const fn from_regex(pattern: Regex) -> Self {
        Self { pattern }
    }

    /// Whether the file name of `path` matches. Paths without a UTF-8 file name never match.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.pattern.is_match(name))
    }
}

/// Enumerate matching regular files directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns `Walkdir` when the directory cannot be read.
pub fn initial_listing(dir: &Path, filter: &DescriptorFilter) -> FsOpsResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| FsOpsError::Walkdir {
            operation: "initial_listing",
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && filter.matches(entry.path()) {
            found.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), count = found.len(), "initial descriptor listing");
    Ok(found)
}

/// Delete a descriptor file.
///
/// # Errors
///
/// Returns `Io` when the file cannot be removed.
pub async fn remove_descriptor(path: &Path) -> FsOpsResult<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| FsOpsError::Io {
            operation: "remove_descriptor",
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filter_matches_file_name_only() -> anyhow::Result<()> {
        let filter = DescriptorFilter::new(r".+\.torrent$")?;
        assert!(filter.matches(Path::new("/watch/movie.torrent")));
        assert!(filter.matches(Path::new("relative/a b.torrent")));
        assert!(!filter.matches(Path::new("/watch/.torrent")));
        assert!(!filter.matches(Path::new("/watch/movie.torrent.part")));
        assert!(!filter.matches(Path::new("/watch.torrent/readme.txt")));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(matches!(
            DescriptorFilter::new("[unclosed"),
            Err(FsOpsError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn listing_is_sorted_flat_and_filtered() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("b.torrent"), b"d")?;
        std::fs::write(temp.path().join("a.torrent"), b"d")?;
        std::fs::write(temp.path().join("notes.txt"), b"n")?;
        std::fs::create_dir(temp.path().join("dir.torrent"))?;
        std::fs::create_dir(temp.path().join("nested"))?;
        std::fs::write(temp.path().join("nested").join("c.torrent"), b"d")?;

        let filter = DescriptorFilter::new(r".+\.torrent$")?;
        let listing = initial_listing(temp.path(), &filter)?;
        assert_eq!(
            listing,
            vec![temp.path().join("a.torrent"), temp.path().join("b.torrent")]
        );
        Ok(())
    }

    #[test]
    fn listing_missing_directory_fails() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let filter = DescriptorFilter::new(r".+\.torrent$")?;
        let result = initial_listing(&temp.path().join("absent"), &filter);
        assert!(matches!(result, Err(FsOpsError::Walkdir { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn remove_descriptor_deletes_and_reports_missing() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("a.torrent");
        std::fs::write(&path, b"d")?;

        remove_descriptor(&path).await?;
        assert!(!path.exists());

        let second = remove_descriptor(&path).await;
        assert!(matches!(
            second,
            Err(FsOpsError::Io {
                operation: "remove_descriptor",
                ..
            })
        ));
        Ok(())
    }
}

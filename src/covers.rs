//! Cover image resolution with a local file cache.
//!
//! A cover is looked up by a key derived from the book title. A cached file
//! wins outright; otherwise the remote source is asked once and a successful
//! body is written verbatim into the cache. Anything else yields the
//! placeholder.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Extension used for cached cover files.
const COVER_EXTENSION: &str = "jpg";

/// URL prefix under which cached covers are served.
pub const COVERS_ROUTE: &str = "/covers";

/// URL of the bundled placeholder image.
pub const PLACEHOLDER_ROUTE: &str = "/static/placeholder.svg";

/// Bundled placeholder image.
pub const PLACEHOLDER_SVG: &str = include_str!("../assets/placeholder.svg");

/// Remote provider of cover images, addressed by ISBN.
#[async_trait]
pub trait CoverSource: Send + Sync {
    /// Fetch cover bytes. `Ok(None)` means the provider answered with a non-200 status.
    async fn fetch(&self, isbn: &str) -> Result<Option<Vec<u8>>>;
}

/// Cover source backed by an HTTP endpoint template such as Open Library's.
pub struct OpenLibraryCovers {
    client: Client,
    endpoint: String,
}

impl OpenLibraryCovers {
    /// Create a source for `endpoint`, where `{isbn}` is substituted per request.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Request URL for an ISBN.
    pub fn url_for(&self, isbn: &str) -> String {
        self.endpoint.replace("{isbn}", &urlencoding::encode(isbn))
    }
}

#[async_trait]
impl CoverSource for OpenLibraryCovers {
    async fn fetch(&self, isbn: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url_for(isbn);
        let response = self.client.get(&url).send().await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(%url, status = %response.status(), "Cover not available");
            return Ok(None);
        }

        let body = response.bytes().await?;
        Ok(Some(body.to_vec()))
    }
}

/// Displayable cover reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CoverImage {
    /// A file in the cover cache directory.
    Cached {
        /// File name inside the cache directory.
        file_name: String,
    },
    /// No cover available.
    Placeholder,
}

impl CoverImage {
    /// URL to use in an `<img>` tag.
    pub fn url(&self, placeholder_url: &str) -> String {
        match self {
            CoverImage::Cached { file_name } => {
                format!("{}/{}", COVERS_ROUTE, urlencoding::encode(file_name))
            }
            CoverImage::Placeholder => placeholder_url.to_string(),
        }
    }
}

/// Derive the cache key for a title.
///
/// Lowercases and turns spaces into underscores, then drops every character
/// other than alphanumerics, `_` and `-`. The result never contains a path
/// separator or a dot.
pub fn cache_key(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Resolves cover images through the local cache and a remote source.
#[derive(Clone)]
pub struct CoverResolver {
    cache_dir: PathBuf,
    source: Arc<dyn CoverSource>,
}

impl CoverResolver {
    /// Create a resolver storing files in `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>, source: Arc<dyn CoverSource>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            source,
        }
    }

    /// Directory holding cached covers.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file name for a book, if one can be derived.
    fn file_name(isbn: &str, title: &str) -> Option<String> {
        let mut key = cache_key(title);
        if key.is_empty() {
            let isbn_key = cache_key(isbn);
            if isbn_key.is_empty() {
                return None;
            }
            key = format!("isbn_{}", isbn_key);
        }
        Some(format!("{}.{}", key, COVER_EXTENSION))
    }

    /// Resolve the cover for a book.
    ///
    /// Performs at most one remote fetch and at most one file write. Fetch
    /// failures of any kind resolve to [`CoverImage::Placeholder`].
    pub async fn resolve(&self, isbn: &str, title: &str) -> CoverImage {
        let Some(file_name) = Self::file_name(isbn, title) else {
            tracing::debug!(isbn, title, "No usable cache key for cover");
            return CoverImage::Placeholder;
        };
        let path = self.cache_dir.join(&file_name);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return CoverImage::Cached { file_name };
        }

        let data = match self.source.fetch(isbn).await {
            Ok(Some(data)) => data,
            Ok(None) => return CoverImage::Placeholder,
            Err(e) => {
                tracing::warn!(isbn, error = %e, "Cover fetch failed");
                return CoverImage::Placeholder;
            }
        };

        let bytes = data.len();
        if let Err(e) = self.store(path.clone(), data).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to cache cover");
            return CoverImage::Placeholder;
        }

        tracing::debug!(isbn, file = %file_name, bytes, "Cover cached");
        CoverImage::Cached { file_name }
    }

    /// Write `data` to `path` through a temporary file in the cache directory.
    ///
    /// The final name only appears once the whole body is on disk; a failed
    /// write removes the temporary file.
    async fn store(&self, path: PathBuf, data: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let dir = self.cache_dir.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".cover-")
                .suffix(".part")
                .tempfile_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| AppError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Cover write task failed: {}", e)))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted cover source that counts requests.
    pub(crate) struct FakeSource {
        response: Option<Vec<u8>>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        pub(crate) fn ok(body: &[u8]) -> Self {
            Self {
                response: Some(body.to_vec()),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn not_found() -> Self {
            Self {
                response: None,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                response: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CoverSource for FakeSource {
        async fn fetch(&self, _isbn: &str) -> Result<Option<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("connection refused".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    fn resolver(dir: &Path, source: Arc<FakeSource>) -> CoverResolver {
        CoverResolver::new(dir.join("covers"), source)
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn cache_key_lowercases_and_underscores() {
        assert_eq!(cache_key("Lonesome Dove"), "lonesome_dove");
        assert_eq!(cache_key("The Grapes of Wrath"), "the_grapes_of_wrath");
    }

    #[test]
    fn cache_key_strips_path_characters() {
        assert_eq!(cache_key("../../etc/passwd"), "etcpasswd");
        assert_eq!(cache_key("Who's Afraid? Vol. 2"), "whos_afraid_vol_2");
        assert!(!cache_key("a/b\\c.d").contains(['/', '\\', '.']));
    }

    #[tokio::test]
    async fn fetches_once_and_caches() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::ok(b"jpeg-bytes"));
        let resolver = resolver(tmp.path(), source.clone());

        let cover = resolver.resolve("9780671683058", "Lonesome Dove").await;
        assert_eq!(
            cover,
            CoverImage::Cached {
                file_name: "lonesome_dove.jpg".to_string()
            }
        );
        assert_eq!(source.calls(), 1);

        let written = std::fs::read(tmp.path().join("covers/lonesome_dove.jpg")).unwrap();
        assert_eq!(written, b"jpeg-bytes");

        let again = resolver.resolve("9780671683058", "Lonesome Dove").await;
        assert_eq!(again, cover);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn cached_write_leaves_no_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::ok(&[7u8; 64 * 1024]));
        let resolver = resolver(tmp.path(), source.clone());

        resolver.resolve("9780671683058", "Lonesome Dove").await;

        let names: Vec<_> = std::fs::read_dir(tmp.path().join("covers"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["lonesome_dove.jpg"]);
        let written = std::fs::read(tmp.path().join("covers/lonesome_dove.jpg")).unwrap();
        assert_eq!(written.len(), 64 * 1024);
    }

    #[tokio::test]
    async fn failed_write_yields_placeholder_and_retries_later() {
        let tmp = tempfile::tempdir().unwrap();
        // The cache directory cannot be created under a regular file.
        let blocker = tmp.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();

        let source = Arc::new(FakeSource::ok(b"jpeg-bytes"));
        let resolver = CoverResolver::new(blocker.join("covers"), source.clone());

        let cover = resolver.resolve("9780671683058", "Lonesome Dove").await;
        assert_eq!(cover, CoverImage::Placeholder);
        assert_eq!(source.calls(), 1);
        assert!(!blocker.join("covers/lonesome_dove.jpg").exists());

        let again = resolver.resolve("9780671683058", "Lonesome Dove").await;
        assert_eq!(again, CoverImage::Placeholder);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn existing_file_is_a_hit_without_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = tmp.path().join("covers");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join("east_of_eden.jpg"), b"").unwrap();

        let source = Arc::new(FakeSource::failing());
        let resolver = resolver(tmp.path(), source.clone());

        let cover = resolver.resolve("123", "East of Eden").await;
        assert!(matches!(cover, CoverImage::Cached { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn non_200_yields_placeholder_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::not_found());
        let resolver = resolver(tmp.path(), source.clone());

        let cover = resolver.resolve("000", "Unknown Book").await;
        assert_eq!(cover, CoverImage::Placeholder);
        assert_eq!(source.calls(), 1);
        assert_eq!(dir_entries(&tmp.path().join("covers")), 0);
    }

    #[tokio::test]
    async fn network_error_is_treated_like_non_200() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::failing());
        let resolver = resolver(tmp.path(), source.clone());

        let cover = resolver.resolve("000", "Unknown Book").await;
        assert_eq!(cover, CoverImage::Placeholder);
        assert_eq!(dir_entries(&tmp.path().join("covers")), 0);

        // No negative caching: the next call asks again.
        resolver.resolve("000", "Unknown Book").await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn empty_title_falls_back_to_isbn_key() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::ok(b"x"));
        let resolver = resolver(tmp.path(), source.clone());

        let cover = resolver.resolve("978-0-14", "???").await;
        assert_eq!(
            cover,
            CoverImage::Cached {
                file_name: "isbn_978-0-14.jpg".to_string()
            }
        );

        let none = resolver.resolve("...", "???").await;
        assert_eq!(none, CoverImage::Placeholder);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn cover_urls() {
        let cached = CoverImage::Cached {
            file_name: "lonesome_dove.jpg".to_string(),
        };
        assert_eq!(cached.url("/ph.png"), "/covers/lonesome_dove.jpg");
        assert_eq!(CoverImage::Placeholder.url("/ph.png"), "/ph.png");
    }

    #[test]
    fn endpoint_template_substitutes_isbn() {
        let source = OpenLibraryCovers::new(
            "https://covers.openlibrary.org/b/isbn/{isbn}-M.jpg",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            source.url_for("9780671683058"),
            "https://covers.openlibrary.org/b/isbn/9780671683058-M.jpg"
        );
    }
}

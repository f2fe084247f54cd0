// Fetches and decodes the shape and overlay images.
// Both images load concurrently; either failing fails the pair, so callers never
// see half a configuration.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::error::LoadError;
use crate::types::DecodedImage;

/// Resolves an opaque image URL to raw encoded bytes.
///
/// The widget never talks to the network itself; the host decides what a
/// URL means by supplying a fetcher.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

/// Reads plain paths and `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>, // relative URLs resolve against this when set
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

impl ImageFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        let path = self.resolve(url);
        let url = url.to_string();
        async move { tokio::fs::read(&path).await.map_err(|e| LoadError::fetch(&url, e)) }
    }
}

/// Serves pre-registered bytes; unknown URLs fail with `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(url.into(), bytes);
    }

    pub fn with(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl ImageFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        let found = self.entries.get(url).cloned().ok_or_else(|| {
            LoadError::fetch(url, io::Error::new(io::ErrorKind::NotFound, "no such image"))
        });
        async move { found }
    }
}

/// Decode bytes into RGBA8, rejecting zero-size images.
pub fn decode(url: &str, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| LoadError::decode(url, e))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(LoadError::EmptyImage { url: url.to_string() });
    }
    Ok(img)
}

async fn load_one<F: ImageFetcher>(fetcher: &F, url: &str) -> Result<DecodedImage, LoadError> {
    let bytes = fetcher.fetch(url).await?;
    let owned_url = url.to_string();
    // Decoding is CPU-bound; keep it off the async workers.
    let img = tokio::task::spawn_blocking(move || decode(&owned_url, &bytes))
        .await
        .map_err(|_| LoadError::Interrupted)??;
    debug!(url, width = img.width(), height = img.height(), "decoded image");
    Ok(img)
}

/// Load `(image_map, image_flag)` concurrently.
pub async fn load<F: ImageFetcher>(
    fetcher: &F,
    url_map: &str,
    url_flag: &str,
) -> Result<(DecodedImage, DecodedImage), LoadError> {
    tokio::try_join!(load_one(fetcher, url_map), load_one(fetcher, url_flag))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn solid(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
    }

    #[tokio::test]
    async fn loads_both_images() {
        let fetcher = MemoryFetcher::new()
            .with("map", png(&solid(4, 3)))
            .with("flag", png(&solid(8, 6)));
        let (map, flag) = load(&fetcher, "map", "flag").await.unwrap();
        assert_eq!(map.dimensions(), (4, 3));
        assert_eq!(flag.dimensions(), (8, 6));
    }

    #[tokio::test]
    async fn one_missing_image_fails_the_pair() {
        let fetcher = MemoryFetcher::new().with("map", png(&solid(4, 3)));
        let err = load(&fetcher, "map", "flag").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { ref url, .. } if url == "flag"));
    }

    #[tokio::test]
    async fn garbage_bytes_are_a_decode_error() {
        let fetcher = MemoryFetcher::new()
            .with("map", b"not an image".to_vec())
            .with("flag", png(&solid(1, 1)));
        let err = load(&fetcher, "map", "flag").await.unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(!err.is_configuration());
    }

    #[tokio::test]
    async fn file_fetcher_reads_paths_and_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.png"), png(&solid(2, 2))).unwrap();
        let fetcher = FileFetcher::with_root(dir.path());
        let bytes = fetcher.fetch("map.png").await.unwrap();
        assert_eq!(decode("map.png", &bytes).unwrap().dimensions(), (2, 2));

        let url = format!("file://{}", dir.path().join("map.png").display());
        assert!(FileFetcher::new().fetch(&url).await.is_ok());
        assert!(matches!(
            FileFetcher::new().fetch("/definitely/not/here.png").await,
            Err(LoadError::Fetch { .. })
        ));
    }
}

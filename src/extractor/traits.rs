use crate::extractor::models::VideoDetails;
use crate::formats::{resolve_formats, ResolvedFormat};
use anyhow::Result;
use async_trait::async_trait;

/// Core trait for metadata lookups
///
/// Keeps the backend independent of how the lookup is performed, so tests can
/// hand it canned details instead of running yt-dlp.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "ytdlp")
    fn id(&self) -> &'static str;

    /// Fetch the URL's metadata and the raw variant list
    async fn extract_info(&self, url: &str) -> Result<VideoDetails>;

    /// Fetch and resolve the variants into one option per quality
    async fn get_formats(&self, url: &str) -> Result<Vec<ResolvedFormat>> {
        let info = self.extract_info(url).await?;
        Ok(resolve_formats(&info.variants))
    }
}

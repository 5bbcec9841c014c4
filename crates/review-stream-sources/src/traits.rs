use crate::error::TransportError;
use async_trait::async_trait;
use review_stream_models::SortDirection;

/// The transport collaborator the pipeline fetches pages through.
///
/// Implementations must be safe to call concurrently for independent
/// directions; the pipeline treats delivery as at-least-once.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Fetch one page of raw response bytes for the given traversal
    /// direction. `token` is `None` for the first page of a direction.
    async fn fetch_page(
        &self,
        direction: SortDirection,
        token: Option<&str>,
    ) -> Result<Vec<u8>, TransportError>;
}

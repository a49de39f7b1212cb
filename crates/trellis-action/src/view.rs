//! Views bypass serialization entirely.

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{Payload, Request, Response, TrellisResult};
use trellis_serializer::RenderOptions;

/// Shared handle to a view, as stored in the container.
pub type ViewRef = Arc<dyn View>;

/// Writes a response directly, for output that is not a serialized document.
///
/// Views are registered under `view:{name}` and selected with
/// [`RenderOptions::view`].
#[async_trait]
pub trait View: Send + Sync {
    /// Renders into the response. Must finish it.
    async fn render(
        &self,
        request: &Request,
        response: &mut Response,
        payload: &Payload,
        options: &RenderOptions,
    ) -> TrellisResult<()>;
}

//! The application-level error handler.

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{Payload, TrellisError, TrellisResult};
use trellis_serializer::RenderOptions;

use crate::action::{Action, ParserChoice};
use crate::context::ActionContext;

/// Name the router resolves the error handler under (`action:error`).
pub const ERROR_ACTION: &str = "error";

/// Renders the error attached to the request through the normal serializer
/// pipeline, with the error's own status code.
///
/// Internal and configuration errors are replaced by a generic message
/// unless `expose_error_details` is set. The request body is not parsed,
/// since a malformed body may be what failed in the first place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorAction;

#[async_trait]
impl Action for ErrorAction {
    fn parser() -> ParserChoice {
        ParserChoice::Skip
    }

    async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        let error = cx.request().error().cloned().unwrap_or_else(|| {
            Arc::new(TrellisError::internal(
                "error handler invoked without an error",
            ))
        });

        if error.status_code().is_server_error() {
            tracing::error!(
                request_id = %cx.request().id(),
                error_code = error.error_code(),
                error = %error,
                "request failed"
            );
        } else {
            tracing::info!(
                request_id = %cx.request().id(),
                error_code = error.error_code(),
                error = %error,
                "request rejected"
            );
        }

        let shown = match error.redacted() {
            Some(redacted) if !cx.defaults().expose_error_details => Arc::new(redacted),
            _ => Arc::clone(&error),
        };
        cx.render(
            error.status_code(),
            Some(Payload::Error(shown)),
            RenderOptions::default(),
        )
        .await?;
        Ok(None)
    }
}

//! HTTP surface serving the gzipped XMLTV feed.
//!
//! Every request first drives [`RegenerationController::run_if_needed`], so
//! the feed refreshes itself on traffic. Failures are reported in-band as a
//! plain-text body with status 200; feed readers poll the same URL either
//! way and surface the text to the operator.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use epgfeed_api::magenta::MagentaApi;
use epgfeed_core::RegenerationController;
use tracing::{error, instrument};

/// Body served while no feed has been generated yet.
pub const PLACEHOLDER_BODY: &str = "No EPG generated yet.";

/// Builds the application router.
pub fn router<A>(controller: Arc<RegenerationController<A>>) -> Router
where
    A: MagentaApi + Sync + 'static,
{
    Router::new()
        .route("/", get(serve_feed::<A>))
        .route("/epg.xml.gz", get(serve_feed::<A>))
        .with_state(controller)
}

/// Serves the published feed, regenerating it first when stale.
#[instrument(skip_all)]
async fn serve_feed<A>(State(controller): State<Arc<RegenerationController<A>>>) -> Response
where
    A: MagentaApi + Sync + 'static,
{
    if let Err(e) = controller.run_if_needed().await {
        error!(error = %e, "feed regeneration failed");
        return (StatusCode::OK, format!("Exception: {e}")).into_response();
    }

    match tokio::fs::read(controller.feed_path()).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/xml"),
                (header::CONTENT_ENCODING, "gzip"),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::OK, PLACEHOLDER_BODY).into_response(),
    }
}

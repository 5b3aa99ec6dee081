//! HTTP surface of the gateway.
//!
//! ## Routes
//! - `PUT    /objects/{*key}` upload, never overwriting
//! - `GET    /objects/{*key}` redirect to a presigned URL
//! - `DELETE /objects/{*key}` delete
//! - `POST   /rename?from=&to=` rename one object
//! - `GET    /folders/{*dir}` folder as `.tar.gz`
//! - `DELETE /folders/{*dir}` delete every object under the folder
//! - `POST   /rename-folder?from=&to=` rename a folder
//! - `GET    /bucket` whole bucket as `.tar.gz`
//! - `GET    /healthz` liveness

mod error;
mod handlers;

use axum::{
    Router,
    routing::{get, post, put},
};
use bgw_core::BucketGateway;
use tower_http::trace::TraceLayer;

/// Build the router with the gateway as shared state
pub fn router(gateway: BucketGateway) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/objects/{*key}",
            put(handlers::upload_object)
                .get(handlers::download_object)
                .delete(handlers::delete_object),
        )
        .route("/rename", post(handlers::rename_object))
        .route(
            "/folders/{*dir}",
            get(handlers::download_folder).delete(handlers::delete_folder),
        )
        .route("/rename-folder", post(handlers::rename_folder))
        .route("/bucket", get(handlers::download_bucket))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

use thiserror::Error;

use crate::api::ApiClientError;
use crate::gpx_canvas::GpxExportError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Everything a planner command can fail with.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("route history error: {0}")]
    Store(#[from] StoreError),
    #[error("route session error: {0}")]
    Session(#[from] SessionError),
    #[error("routing service error: {0}")]
    Api(#[from] ApiClientError),
    #[error("failed to export GPX: {0}")]
    Gpx(#[from] GpxExportError),
    #[error("failed to open data directory: {0}")]
    DataDir(#[source] std::io::Error),
    #[error("no route with id {0} in history")]
    UnknownRoute(String),
}

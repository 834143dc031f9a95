pub mod api;
pub mod config;
pub mod error;
pub mod estimate;
pub mod gpx_canvas;
pub mod map;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

use crate::api::RouteApiClient;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::gpx_canvas::GpxCanvas;
use crate::session::RouteSession;
use crate::storage::FileStorage;
use crate::store::RecentRoutesStore;

/// Session wired to the HTTP client, the GPX canvas and on-disk history.
pub type PlannerSession = RouteSession<RouteApiClient, GpxCanvas, FileStorage>;

pub fn open_history(config: &PlannerConfig) -> Result<RecentRoutesStore<FileStorage>, PlannerError> {
    let storage = FileStorage::open(&config.data_dir).map_err(PlannerError::DataDir)?;
    tracing::debug!("route history in {}", storage.root().display());
    Ok(RecentRoutesStore::open(storage)?)
}

pub fn create_session(config: &PlannerConfig) -> Result<PlannerSession, PlannerError> {
    let store = open_history(config)?;
    let api = RouteApiClient::new(config.api_root.as_str());
    tracing::info!("using routing service at {}", api.base_url());
    Ok(RouteSession::new(api, GpxCanvas::new(), store))
}

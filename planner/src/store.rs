//! Recent routes history.
//!
//! Bounded at [`MAX_ROUTES`], newest first. Every mutation rewrites the whole
//! collection under [`ROUTES_KEY`], so the persisted document always equals
//! the in-memory sequence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use shared::{GeoPoint, ValidationError};

use crate::storage::StorageBackend;

pub const ROUTES_KEY: &str = "aquaintel_routes";
pub const MAX_ROUTES: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("route storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize routes: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("stored routes are corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Summary of one completed calculation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SavedRouteRecord", try_from = "SavedRouteRecord")]
pub struct SavedRoute {
    pub id: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
    pub path_length: usize,
    pub created_at: DateTime<Utc>,
}

/// Persisted shape of a [`SavedRoute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedRouteRecord {
    id: String,
    start_lat: f64,
    start_lon: f64,
    end_lat: f64,
    end_lon: f64,
    distance: f64,
    estimated_time: f64,
    path_length: usize,
    timestamp: DateTime<Utc>,
}

impl From<SavedRoute> for SavedRouteRecord {
    fn from(route: SavedRoute) -> Self {
        Self {
            id: route.id,
            start_lat: route.start.lat(),
            start_lon: route.start.lon(),
            end_lat: route.end.lat(),
            end_lon: route.end.lon(),
            distance: route.distance_km,
            estimated_time: route.estimated_time_hours,
            path_length: route.path_length,
            timestamp: route.created_at,
        }
    }
}

impl TryFrom<SavedRouteRecord> for SavedRoute {
    type Error = ValidationError;

    fn try_from(record: SavedRouteRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            start: GeoPoint::new(record.start_lat, record.start_lon)?,
            end: GeoPoint::new(record.end_lat, record.end_lon)?,
            distance_km: record.distance,
            estimated_time_hours: record.estimated_time,
            path_length: record.path_length,
            created_at: record.timestamp,
        })
    }
}

/// A downloadable JSON document of the whole history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
}

impl ExportArtifact {
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "aquaintel-routes-{}.json",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

pub fn parse_export(contents: &str) -> Result<Vec<SavedRoute>, StoreError> {
    serde_json::from_str(contents).map_err(StoreError::Corrupt)
}

pub struct RecentRoutesStore<B> {
    backend: B,
    routes: Vec<SavedRoute>,
}

impl<B: StorageBackend> RecentRoutesStore<B> {
    /// Opens the store and loads whatever the backend holds.
    pub fn open(backend: B) -> Result<Self, StoreError> {
        let mut store = Self {
            backend,
            routes: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Re-reads the persisted collection. A missing key is an empty history.
    pub fn load(&mut self) -> Result<&[SavedRoute], StoreError> {
        self.routes = match self.backend.read(ROUTES_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(StoreError::Corrupt)?,
            None => Vec::new(),
        };
        tracing::debug!("loaded {} recent routes", self.routes.len());
        Ok(&self.routes)
    }

    pub fn routes(&self) -> &[SavedRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SavedRoute> {
        self.routes.iter().find(|route| route.id == id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Puts `route` first and evicts anything past [`MAX_ROUTES`].
    pub fn add(&mut self, route: SavedRoute) -> Result<(), StoreError> {
        let mut next = Vec::with_capacity(MAX_ROUTES);
        next.push(route);
        next.extend(self.routes.iter().cloned());
        if next.len() > MAX_ROUTES {
            tracing::debug!("evicting {} oldest routes", next.len() - MAX_ROUTES);
            next.truncate(MAX_ROUTES);
        }
        self.persist(&next)?;
        self.routes = next;
        Ok(())
    }

    /// Builds a [`SavedRoute`] with a fresh id and adds it.
    pub fn record(
        &mut self,
        start: GeoPoint,
        end: GeoPoint,
        distance_km: f64,
        estimated_time_hours: f64,
        path_length: usize,
        now: DateTime<Utc>,
    ) -> Result<SavedRoute, StoreError> {
        let route = SavedRoute {
            id: self.next_id(now),
            start,
            end,
            distance_km,
            estimated_time_hours,
            path_length,
            created_at: now,
        };
        self.add(route.clone())?;
        tracing::info!(
            "recorded route {} ({:.2} km, {} points)",
            route.id,
            route.distance_km,
            route.path_length
        );
        Ok(route)
    }

    /// Removes the route with `id`. Unknown ids leave the history as it was.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let next: Vec<SavedRoute> = self
            .routes
            .iter()
            .filter(|route| route.id != id)
            .cloned()
            .collect();
        if next.len() == self.routes.len() {
            tracing::debug!("route {id} not in history");
        }
        self.persist(&next)?;
        self.routes = next;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.backend.remove(ROUTES_KEY)?;
        self.routes.clear();
        tracing::info!("route history cleared");
        Ok(())
    }

    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportArtifact, StoreError> {
        let contents =
            serde_json::to_string_pretty(&self.routes).map_err(StoreError::Serialize)?;
        Ok(ExportArtifact {
            file_name: export_file_name(now),
            contents,
        })
    }

    /// Epoch milliseconds of `now`, bumped past the newest stored id so ids
    /// stay strictly increasing within one millisecond.
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let newest = self
            .routes
            .first()
            .and_then(|route| route.id.parse::<i64>().ok());
        match newest {
            Some(newest) if newest >= millis => (newest + 1).to_string(),
            _ => millis.to_string(),
        }
    }

    fn persist(&mut self, routes: &[SavedRoute]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(routes).map_err(StoreError::Serialize)?;
        self.backend.write(ROUTES_KEY, &raw)?;
        Ok(())
    }
}

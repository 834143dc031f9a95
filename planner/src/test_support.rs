//! Shared doubles for unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use reqwest::StatusCode;
use shared::{GeoPoint, HealthStatus, RouteBounds};

use crate::api::{ApiClientError, RouteApi, RouteResult};
use crate::map::{CanvasError, LayerHandle, MapCanvas, MarkerKind};

pub fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).expect("test coordinate in range")
}

#[derive(Debug, Clone)]
enum Layer {
    Marker(MarkerKind, GeoPoint),
    Polyline(Vec<GeoPoint>),
}

/// Canvas that remembers live layers and every fit request.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    next_id: u64,
    layers: BTreeMap<u64, Layer>,
    fitted: Vec<(RouteBounds, u32)>,
    refuse_fits: bool,
}

impl RecordingCanvas {
    pub fn refusing_fits() -> Self {
        Self {
            refuse_fits: true,
            ..Self::default()
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn marker(&self, kind: MarkerKind) -> Option<GeoPoint> {
        self.layers.values().find_map(|layer| match layer {
            Layer::Marker(k, p) if *k == kind => Some(*p),
            _ => None,
        })
    }

    pub fn polylines(&self) -> Vec<Vec<GeoPoint>> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Polyline(path) => Some(path.clone()),
                Layer::Marker(..) => None,
            })
            .collect()
    }

    pub fn fitted(&self) -> &[(RouteBounds, u32)] {
        &self.fitted
    }

    fn insert(&mut self, layer: Layer) -> LayerHandle {
        self.next_id += 1;
        self.layers.insert(self.next_id, layer);
        LayerHandle(self.next_id)
    }
}

impl MapCanvas for RecordingCanvas {
    fn place_marker(&mut self, kind: MarkerKind, point: GeoPoint) -> LayerHandle {
        self.insert(Layer::Marker(kind, point))
    }

    fn draw_polyline(&mut self, path: &[GeoPoint]) -> LayerHandle {
        self.insert(Layer::Polyline(path.to_vec()))
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        self.layers.remove(&handle.0);
    }

    fn fit_bounds(
        &mut self,
        bounds: &RouteBounds,
        padding_px: u32,
        _max_zoom: u8,
    ) -> Result<(), CanvasError> {
        if self.refuse_fits {
            return Err(CanvasError::Rejected("map not attached".into()));
        }
        if bounds.is_degenerate() {
            return Err(CanvasError::DegenerateBounds);
        }
        self.fitted.push((*bounds, padding_px));
        Ok(())
    }
}

/// Routing double answering from a script and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    responses: Mutex<VecDeque<Result<RouteResult, ApiClientError>>>,
    calls: Mutex<Vec<(GeoPoint, GeoPoint)>>,
}

impl ScriptedApi {
    pub fn responding(response: Result<RouteResult, ApiClientError>) -> Self {
        let api = Self::default();
        api.push(response);
        api
    }

    pub fn push(&self, response: Result<RouteResult, ApiClientError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<(GeoPoint, GeoPoint)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RouteApi for ScriptedApi {
    async fn calculate_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteResult, ApiClientError> {
        self.calls.lock().unwrap().push((start, end));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ApiClientError::Api {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    detail: "no scripted response".into(),
                })
            })
    }

    async fn health_check(&self) -> Result<HealthStatus, ApiClientError> {
        Ok(HealthStatus {
            status: "healthy".into(),
            message: "scripted".into(),
            version: "test".into(),
        })
    }
}

pub fn route_result(path: &[[f64; 2]], distance: Option<f64>, time: Option<f64>) -> RouteResult {
    RouteResult {
        path: path.iter().map(|&[lat, lon]| point(lat, lon)).collect(),
        distance_km: distance,
        estimated_time_hours: time,
        message: None,
    }
}

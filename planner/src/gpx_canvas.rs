use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use shared::{GeoPoint, RouteBounds};

use crate::map::{CanvasError, LayerHandle, MapCanvas, MarkerKind};

#[derive(Debug, thiserror::Error)]
pub enum GpxExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to write GPX file: {0}")]
    Io(#[from] std::io::Error),
}

/// Region the view was last fitted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: RouteBounds,
    pub padding_px: u32,
    pub max_zoom: u8,
}

#[derive(Debug, Clone)]
enum Layer {
    Marker(MarkerKind, GeoPoint),
    Track(Vec<GeoPoint>),
}

/// Headless map that keeps its layers in memory and renders them as GPX.
#[derive(Debug, Default)]
pub struct GpxCanvas {
    next_id: u64,
    layers: BTreeMap<u64, Layer>,
    viewport: Option<Viewport>,
}

impl GpxCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn marker(&self, kind: MarkerKind) -> Option<GeoPoint> {
        self.layers.values().find_map(|layer| match layer {
            Layer::Marker(k, point) if *k == kind => Some(*point),
            _ => None,
        })
    }

    pub fn track(&self) -> Option<&[GeoPoint]> {
        self.layers.values().find_map(|layer| match layer {
            Layer::Track(path) => Some(path.as_slice()),
            Layer::Marker(..) => None,
        })
    }

    pub fn to_gpx(&self) -> Gpx {
        let mut gpx = Gpx {
            version: GpxVersion::Gpx11,
            creator: Some("aquaintel".into()),
            ..Default::default()
        };

        for (kind, name) in [(MarkerKind::Start, "Start"), (MarkerKind::End, "End")] {
            if let Some(point) = self.marker(kind) {
                let mut waypoint = to_waypoint(&point);
                waypoint.name = Some(name.into());
                gpx.waypoints.push(waypoint);
            }
        }

        if let Some(path) = self.track() {
            let mut track = Track {
                name: Some("aquaintel route".into()),
                ..Default::default()
            };
            let mut segment = TrackSegment::new();
            segment.points.extend(path.iter().map(to_waypoint));
            track.segments.push(segment);
            gpx.tracks.push(track);
        }

        gpx
    }

    pub fn write_gpx<W: Write>(&self, writer: W) -> Result<(), GpxExportError> {
        gpx::write(&self.to_gpx(), writer)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), GpxExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_gpx(&mut writer)?;
        writer.flush()?;
        tracing::info!("map state written to {}", path.display());
        Ok(())
    }

    fn insert(&mut self, layer: Layer) -> LayerHandle {
        self.next_id += 1;
        self.layers.insert(self.next_id, layer);
        LayerHandle(self.next_id)
    }
}

impl MapCanvas for GpxCanvas {
    fn place_marker(&mut self, kind: MarkerKind, point: GeoPoint) -> LayerHandle {
        self.insert(Layer::Marker(kind, point))
    }

    fn draw_polyline(&mut self, path: &[GeoPoint]) -> LayerHandle {
        self.insert(Layer::Track(path.to_vec()))
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        self.layers.remove(&handle.0);
    }

    fn fit_bounds(
        &mut self,
        bounds: &RouteBounds,
        padding_px: u32,
        max_zoom: u8,
    ) -> Result<(), CanvasError> {
        if bounds.is_degenerate() {
            return Err(CanvasError::DegenerateBounds);
        }
        self.viewport = Some(Viewport {
            bounds: *bounds,
            padding_px,
            max_zoom,
        });
        Ok(())
    }
}

fn to_waypoint(point: &GeoPoint) -> Waypoint {
    Waypoint::new(Point::new(point.lon(), point.lat()))
}

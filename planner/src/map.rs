//! Map interaction surface.
//!
//! [`MapSurface`] turns raw map clicks into start/end selections using a
//! two-phase toggle, and keeps the marker and polyline layers it placed on a
//! [`MapCanvas`] so they can be replaced or cleared. It holds no business
//! state beyond the phase and those layer handles.

use shared::{GeoPoint, RouteBounds};

/// Margin, in pixels, kept around a path when the view is fitted to it.
pub const FIT_PADDING_PX: u32 = 50;
/// Fitting never zooms closer than this level.
pub const FIT_MAX_ZOOM: u8 = 10;

/// Opaque id of a layer a canvas has drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanvasError {
    #[error("cannot fit view to a region without area")]
    DegenerateBounds,
    #[error("canvas rejected the operation: {0}")]
    Rejected(String),
}

/// Capabilities the surface needs from a rendering library.
pub trait MapCanvas {
    fn place_marker(&mut self, kind: MarkerKind, point: GeoPoint) -> LayerHandle;
    fn draw_polyline(&mut self, path: &[GeoPoint]) -> LayerHandle;
    fn remove_layer(&mut self, handle: LayerHandle);
    fn fit_bounds(
        &mut self,
        bounds: &RouteBounds,
        padding_px: u32,
        max_zoom: u8,
    ) -> Result<(), CanvasError>;
}

/// Which point the next click selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Start,
    End,
}

/// Receives the selections produced by map clicks.
pub trait SelectionListener {
    fn on_start_point_set(&mut self, point: GeoPoint);
    fn on_end_point_set(&mut self, point: GeoPoint);
}

pub struct MapSurface<C> {
    canvas: C,
    phase: Phase,
    start_marker: Option<LayerHandle>,
    end_marker: Option<LayerHandle>,
    path_layer: Option<LayerHandle>,
    last_reset: u64,
}

impl<C: MapCanvas> MapSurface<C> {
    pub fn new(canvas: C) -> Self {
        Self {
            canvas,
            phase: Phase::Start,
            start_marker: None,
            end_marker: None,
            path_layer: None,
            last_reset: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn has_path(&self) -> bool {
        self.path_layer.is_some()
    }

    /// Handles one click. A third click wraps around and replaces the start
    /// marker again; the end marker is left where it was.
    pub fn click<L>(&mut self, point: GeoPoint, listener: &mut L)
    where
        L: SelectionListener + ?Sized,
    {
        tracing::debug!(
            "map click phase={:?} lat={:.5} lon={:.5}",
            self.phase,
            point.lat(),
            point.lon()
        );
        match self.phase {
            Phase::Start => {
                self.replace_marker(MarkerKind::Start, point);
                listener.on_start_point_set(point);
                self.phase = Phase::End;
            }
            Phase::End => {
                self.replace_marker(MarkerKind::End, point);
                listener.on_end_point_set(point);
                self.phase = Phase::Start;
            }
        }
    }

    /// Replaces the drawn path. An empty path leaves the map untouched.
    pub fn draw_path(&mut self, path: &[GeoPoint]) {
        if path.is_empty() {
            return;
        }
        if let Some(previous) = self.path_layer.take() {
            self.canvas.remove_layer(previous);
        }
        self.path_layer = Some(self.canvas.draw_polyline(path));

        if path.len() > 2 {
            let fitted = RouteBounds::from_path(path)
                .ok_or(CanvasError::DegenerateBounds)
                .and_then(|bounds| {
                    self.canvas
                        .fit_bounds(&bounds, FIT_PADDING_PX, FIT_MAX_ZOOM)
                });
            if let Err(err) = fitted {
                tracing::warn!("error fitting view to route of {} points: {err}", path.len());
            }
        }
    }

    /// Clears markers, path and phase for any signal other than the initial
    /// `0`. Signals must strictly increase; a repeated value is ignored.
    pub fn reset(&mut self, signal: u64) {
        if signal == 0 || signal <= self.last_reset {
            return;
        }
        self.last_reset = signal;
        self.clear_layers();
        self.phase = Phase::Start;
        tracing::debug!("map surface reset (signal {signal})");
    }

    /// Removes every layer this surface owns and hands the canvas back.
    pub fn teardown(mut self) -> C {
        self.clear_layers();
        self.canvas
    }

    fn replace_marker(&mut self, kind: MarkerKind, point: GeoPoint) {
        let slot = match kind {
            MarkerKind::Start => &mut self.start_marker,
            MarkerKind::End => &mut self.end_marker,
        };
        if let Some(previous) = slot.take() {
            self.canvas.remove_layer(previous);
        }
        *slot = Some(self.canvas.place_marker(kind, point));
    }

    fn clear_layers(&mut self) {
        for handle in [
            self.start_marker.take(),
            self.end_marker.take(),
            self.path_layer.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.canvas.remove_layer(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingCanvas, point};

    #[derive(Default)]
    struct Picks {
        starts: Vec<GeoPoint>,
        ends: Vec<GeoPoint>,
    }

    impl SelectionListener for Picks {
        fn on_start_point_set(&mut self, point: GeoPoint) {
            self.starts.push(point);
        }

        fn on_end_point_set(&mut self, point: GeoPoint) {
            self.ends.push(point);
        }
    }

    #[test]
    fn clicks_alternate_between_start_and_end() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        let mut picks = Picks::default();

        surface.click(point(1.0, 1.0), &mut picks);
        assert_eq!(surface.phase(), Phase::End);
        surface.click(point(2.0, 2.0), &mut picks);
        assert_eq!(surface.phase(), Phase::Start);

        assert_eq!(picks.starts, vec![point(1.0, 1.0)]);
        assert_eq!(picks.ends, vec![point(2.0, 2.0)]);
        assert_eq!(surface.canvas().marker(MarkerKind::Start), Some(point(1.0, 1.0)));
        assert_eq!(surface.canvas().marker(MarkerKind::End), Some(point(2.0, 2.0)));
    }

    #[test]
    fn third_click_replaces_start_and_keeps_end_marker() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        let mut picks = Picks::default();

        for p in [point(1.0, 1.0), point(2.0, 2.0), point(3.0, 3.0)] {
            surface.click(p, &mut picks);
        }

        assert_eq!(picks.starts, vec![point(1.0, 1.0), point(3.0, 3.0)]);
        assert_eq!(surface.canvas().marker(MarkerKind::Start), Some(point(3.0, 3.0)));
        assert_eq!(surface.canvas().marker(MarkerKind::End), Some(point(2.0, 2.0)));
        assert_eq!(surface.canvas().layer_count(), 2);
    }

    #[test]
    fn drawing_replaces_previous_path_and_keeps_phase() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        let mut picks = Picks::default();
        surface.click(point(1.0, 1.0), &mut picks);

        surface.draw_path(&[point(1.0, 1.0), point(2.0, 2.0)]);
        surface.draw_path(&[point(1.0, 1.0), point(1.5, 1.2), point(2.0, 2.0)]);

        assert_eq!(surface.phase(), Phase::End);
        assert_eq!(surface.canvas().polylines().len(), 1);
        assert_eq!(surface.canvas().polylines()[0].len(), 3);
    }

    #[test]
    fn only_paths_longer_than_two_points_fit_the_view() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        surface.draw_path(&[point(1.0, 1.0), point(2.0, 2.0)]);
        assert!(surface.canvas().fitted().is_empty());

        surface.draw_path(&[point(1.0, 1.0), point(1.5, 1.2), point(2.0, 2.0)]);
        assert_eq!(surface.canvas().fitted().len(), 1);
        assert_eq!(surface.canvas().fitted()[0].1, FIT_PADDING_PX);
    }

    #[test]
    fn fit_failure_is_swallowed() {
        let mut surface = MapSurface::new(RecordingCanvas::refusing_fits());
        let same = point(4.0, 4.0);
        surface.draw_path(&[same, same, same]);
        assert!(surface.has_path());
    }

    #[test]
    fn empty_path_keeps_previous_drawing() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        surface.draw_path(&[point(1.0, 1.0), point(2.0, 2.0)]);
        surface.draw_path(&[]);
        assert_eq!(surface.canvas().polylines().len(), 1);
    }

    #[test]
    fn reset_ignores_sentinel_and_repeated_signals() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        let mut picks = Picks::default();
        surface.click(point(1.0, 1.0), &mut picks);

        surface.reset(0);
        assert_eq!(surface.phase(), Phase::End);
        assert_eq!(surface.canvas().layer_count(), 1);

        surface.reset(1);
        assert_eq!(surface.phase(), Phase::Start);
        assert_eq!(surface.canvas().layer_count(), 0);

        surface.click(point(2.0, 2.0), &mut picks);
        surface.reset(1);
        assert_eq!(surface.canvas().layer_count(), 1);

        surface.reset(2);
        assert_eq!(surface.canvas().layer_count(), 0);
    }

    #[test]
    fn teardown_removes_every_layer() {
        let mut surface = MapSurface::new(RecordingCanvas::default());
        let mut picks = Picks::default();
        surface.click(point(1.0, 1.0), &mut picks);
        surface.click(point(2.0, 2.0), &mut picks);
        surface.draw_path(&[point(1.0, 1.0), point(2.0, 2.0)]);

        let canvas = surface.teardown();
        assert_eq!(canvas.layer_count(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_odd_clicks_set_start_even_clicks_set_end(
                coords in prop::collection::vec((-90.0..=90.0f64, -180.0..=180.0f64), 1..20)
            ) {
                let mut surface = MapSurface::new(RecordingCanvas::default());
                let mut picks = Picks::default();
                let points: Vec<GeoPoint> = coords.iter().map(|&(lat, lon)| point(lat, lon)).collect();

                for p in &points {
                    surface.click(*p, &mut picks);
                }

                let odd: Vec<GeoPoint> = points.iter().step_by(2).copied().collect();
                let even: Vec<GeoPoint> = points.iter().skip(1).step_by(2).copied().collect();
                prop_assert_eq!(picks.starts, odd);
                prop_assert_eq!(picks.ends, even);
                let expected = if points.len() % 2 == 0 { Phase::Start } else { Phase::End };
                prop_assert_eq!(surface.phase(), expected);
            }
        }
    }
}

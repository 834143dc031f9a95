//! Route planning session.
//!
//! The session owns the selected points and the calculation lifecycle:
//!
//! ```text
//! Idle --start--> StartSet --end--> BothSet --calculate--> Calculating
//! Calculating --ok--> Calculated      Calculating --err--> Failed
//! any --clear--> Idle
//! ```
//!
//! Every calculation carries a generation number. [`RouteSession::clear`] and
//! each new calculation bump it, and a response that comes back for an older
//! generation is dropped without touching the session.

use chrono::Utc;
use shared::{GeoPoint, RouteRequest, ValidationError};

use crate::api::{ApiClientError, RouteApi, RouteResult};
use crate::estimate::fill_route_figures;
use crate::map::{MapCanvas, MapSurface, Phase, SelectionListener};
use crate::storage::StorageBackend;
use crate::store::{RecentRoutesStore, SavedRoute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    StartSet,
    BothSet,
    Calculating,
    Calculated,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid coordinates: {0}")]
    Validation(#[from] ValidationError),
    #[error("start and end points must both be set before calculating")]
    MissingPoints,
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error("routing service returned no usable path")]
    EmptyRoute,
}

impl SessionError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Invalid coordinates: {err}"),
            Self::MissingPoints => "Please set both start and end points on the map".into(),
            Self::Api(ApiClientError::Api { detail, .. }) => format!("Error: {detail}"),
            Self::Api(ApiClientError::MalformedResponse(_)) => {
                "Error: unexpected response from routing service".into()
            }
            Self::Api(ApiClientError::Network(_)) => {
                "Failed to calculate route. Please try again.".into()
            }
            Self::EmptyRoute => "No valid route found".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Points chosen so far plus the lifecycle state. This is what the map
/// surface reports clicks to.
#[derive(Debug)]
pub struct Selection {
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
    state: SessionState,
    notice: Option<Notice>,
}

impl Selection {
    fn new() -> Self {
        Self {
            start: None,
            end: None,
            state: SessionState::Idle,
            notice: None,
        }
    }

    /// Derives the resting state from the points. Leaves `Calculating` alone
    /// so an outstanding request keeps its guard.
    fn settle(&mut self) {
        if self.state == SessionState::Calculating {
            return;
        }
        self.state = match (self.start, self.end) {
            (Some(_), Some(_)) => SessionState::BothSet,
            (Some(_), None) => SessionState::StartSet,
            _ => SessionState::Idle,
        };
    }

    fn announce(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
        }
        self.notice = Some(notice);
    }
}

impl SelectionListener for Selection {
    fn on_start_point_set(&mut self, point: GeoPoint) {
        self.start = Some(point);
        self.settle();
        self.announce(Notice::new(NoticeLevel::Success, "Start point set"));
    }

    fn on_end_point_set(&mut self, point: GeoPoint) {
        self.end = Some(point);
        self.settle();
        self.announce(Notice::new(
            NoticeLevel::Success,
            "End point set. Click Calculate Route to proceed.",
        ));
    }
}

/// Normalized result of the last successful calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedRoute {
    pub path: Vec<GeoPoint>,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
    pub message: Option<String>,
    /// History entry, absent when the history could not be written.
    pub saved: Option<SavedRoute>,
}

/// Proof that a calculation was started, redeemed by
/// [`RouteSession::finish_calculation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationTicket {
    generation: u64,
    request: RouteRequest,
}

impl CalculationTicket {
    pub fn start(&self) -> GeoPoint {
        self.request.start
    }

    pub fn end(&self) -> GeoPoint {
        self.request.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalculationOutcome {
    Calculated(CalculatedRoute),
    /// The session was cleared or recalculated while the request was out.
    Stale,
}

/// Ensures the session leaves `Calculating` even if the calculation future is
/// dropped mid-request.
struct InFlight<'a> {
    selection: &'a mut Selection,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed && self.selection.state == SessionState::Calculating {
            tracing::warn!("route calculation abandoned before a response arrived");
            self.selection.state = SessionState::Idle;
            self.selection.settle();
        }
    }
}

/// Normalizes `path` so it begins exactly at `start` and ends exactly at
/// `end`, adding each endpoint only when it is missing.
pub fn normalize_path(mut path: Vec<GeoPoint>, start: GeoPoint, end: GeoPoint) -> Vec<GeoPoint> {
    if path.first() != Some(&start) {
        path.insert(0, start);
    }
    if path.last() != Some(&end) {
        path.push(end);
    }
    path
}

pub struct RouteSession<A, C, B> {
    api: A,
    surface: MapSurface<C>,
    store: RecentRoutesStore<B>,
    selection: Selection,
    route: Option<CalculatedRoute>,
    generation: u64,
    clear_trigger: u64,
}

impl<A, C, B> RouteSession<A, C, B>
where
    A: RouteApi,
    C: MapCanvas,
    B: StorageBackend,
{
    pub fn new(api: A, canvas: C, store: RecentRoutesStore<B>) -> Self {
        Self {
            api,
            surface: MapSurface::new(canvas),
            store,
            selection: Selection::new(),
            route: None,
            generation: 0,
            clear_trigger: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.selection.state
    }

    pub fn phase(&self) -> Phase {
        self.surface.phase()
    }

    pub fn start(&self) -> Option<GeoPoint> {
        self.selection.start
    }

    pub fn end(&self) -> Option<GeoPoint> {
        self.selection.end
    }

    pub fn route(&self) -> Option<&CalculatedRoute> {
        self.route.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.selection.notice.as_ref()
    }

    /// Whether the calculate control should be enabled.
    pub fn can_calculate(&self) -> bool {
        self.selection.start.is_some()
            && self.selection.end.is_some()
            && self.selection.state != SessionState::Calculating
    }

    pub fn clear_trigger(&self) -> u64 {
        self.clear_trigger
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn surface(&self) -> &MapSurface<C> {
        &self.surface
    }

    pub fn store(&self) -> &RecentRoutesStore<B> {
        &self.store
    }

    /// Forwards a map click to the surface, which reports back through the
    /// selection listener.
    pub fn click(&mut self, point: GeoPoint) {
        self.surface.click(point, &mut self.selection);
    }

    /// Validates raw click coordinates before forwarding them.
    pub fn click_at(&mut self, lat: f64, lon: f64) -> Result<(), SessionError> {
        match GeoPoint::new(lat, lon) {
            Ok(point) => {
                self.click(point);
                Ok(())
            }
            Err(err) => {
                let err = SessionError::from(err);
                self.selection
                    .announce(Notice::new(NoticeLevel::Error, err.user_message()));
                Err(err)
            }
        }
    }

    /// Moves to `Calculating` and hands out the ticket for the request.
    pub fn begin_calculation(&mut self) -> Result<CalculationTicket, SessionError> {
        let (Some(start), Some(end)) = (self.selection.start, self.selection.end) else {
            let err = SessionError::MissingPoints;
            self.selection
                .announce(Notice::new(NoticeLevel::Error, err.user_message()));
            return Err(err);
        };
        if self.selection.state == SessionState::Calculating {
            tracing::warn!(
                "superseding outstanding calculation (generation {})",
                self.generation
            );
        }
        self.generation += 1;
        self.selection.state = SessionState::Calculating;
        self.selection.announce(Notice::new(
            NoticeLevel::Info,
            "Calculating optimal route...",
        ));
        Ok(CalculationTicket {
            generation: self.generation,
            request: RouteRequest { start, end },
        })
    }

    /// Applies the response for `ticket`. Failures are recorded as the
    /// session notice and also returned to the caller.
    pub fn finish_calculation(
        &mut self,
        ticket: CalculationTicket,
        result: Result<RouteResult, ApiClientError>,
    ) -> Result<CalculationOutcome, SessionError> {
        if ticket.generation != self.generation {
            tracing::warn!(
                "discarding response for generation {} (current {})",
                ticket.generation,
                self.generation
            );
            return Ok(CalculationOutcome::Stale);
        }

        let result = match result {
            Ok(result) if result.path.is_empty() => Err(SessionError::EmptyRoute),
            Ok(result) => Ok(result),
            Err(err) => Err(SessionError::Api(err)),
        };
        match result {
            Ok(result) => Ok(CalculationOutcome::Calculated(
                self.apply_route(ticket.request, result),
            )),
            Err(err) => {
                self.selection.state = SessionState::Failed;
                self.selection
                    .announce(Notice::new(NoticeLevel::Error, err.user_message()));
                Err(err)
            }
        }
    }

    /// Runs a full calculation against the session's API client.
    pub async fn calculate(&mut self) -> Result<CalculationOutcome, SessionError> {
        let ticket = self.begin_calculation()?;
        let result = {
            let mut guard = InFlight {
                selection: &mut self.selection,
                armed: true,
            };
            let result = self.api.calculate_route(ticket.start(), ticket.end()).await;
            guard.armed = false;
            result
        };
        self.finish_calculation(ticket, result)
    }

    /// Drops points, route and state, invalidates outstanding requests and
    /// resets the map.
    pub fn clear(&mut self) {
        self.selection.start = None;
        self.selection.end = None;
        self.selection.state = SessionState::Idle;
        self.route = None;
        self.generation += 1;
        self.clear_trigger += 1;
        self.surface.reset(self.clear_trigger);
        self.selection
            .announce(Notice::new(NoticeLevel::Info, "Route cleared"));
    }

    /// Ends the session, removing its layers from the canvas.
    pub fn close(self) -> (C, RecentRoutesStore<B>) {
        (self.surface.teardown(), self.store)
    }

    fn apply_route(&mut self, request: RouteRequest, result: RouteResult) -> CalculatedRoute {
        let path = normalize_path(result.path, request.start, request.end);
        let (distance_km, estimated_time_hours) =
            fill_route_figures(&path, result.distance_km, result.estimated_time_hours);

        self.selection.state = SessionState::Calculated;
        self.surface.draw_path(&path);

        let saved = match self.store.record(
            request.start,
            request.end,
            distance_km,
            estimated_time_hours,
            path.len(),
            Utc::now(),
        ) {
            Ok(saved) => Some(saved),
            Err(err) => {
                self.selection.announce(Notice::new(
                    NoticeLevel::Warning,
                    format!("Route calculated but could not be saved: {err}"),
                ));
                None
            }
        };
        if saved.is_some() {
            self.selection.announce(Notice::new(
                NoticeLevel::Success,
                format!(
                    "Route calculated! Distance: {distance_km:.2} km, Time: {estimated_time_hours:.2} hours"
                ),
            ));
        }

        let route = CalculatedRoute {
            path,
            distance_km,
            estimated_time_hours,
            message: result.message,
            saved,
        };
        self.route = Some(route.clone());
        route
    }
}

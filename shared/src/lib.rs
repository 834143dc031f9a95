use serde::{Deserialize, Serialize};

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate component is not a finite number")]
    NotFinite,
}

/// A validated WGS84 position. Fields are private so every instance went
/// through [`GeoPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = ValidationError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lon)
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if lat.is_nan() || lon.is_nan() {
            return Err(ValidationError::NotFinite);
        }
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(self) -> f64 {
        self.lat
    }

    pub fn lon(self) -> f64 {
        self.lon
    }

    /// `[lat, lon]`, the pair order used on the routing wire.
    pub fn to_pair(self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    pub fn from_pair([lat, lon]: [f64; 2]) -> Result<Self, ValidationError> {
        Self::new(lat, lon)
    }
}

/// Parses `"lat,lon"` as typed on the command line or in a form field.
impl std::str::FromStr for GeoPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON but got {s:?}"))?;
        let parse = |field: &str, label: &str| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid {label} {field:?}"))
        };
        Self::new(parse(lat, "latitude")?, parse(lon, "longitude")?).map_err(|e| e.to_string())
    }
}

/// Both endpoints of a route calculation. Serialized in the routing service's
/// flat wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "RouteRequestBody", try_from = "RouteRequestBody")]
pub struct RouteRequest {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteRequestBody {
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
}

impl From<RouteRequest> for RouteRequestBody {
    fn from(req: RouteRequest) -> Self {
        Self {
            start_latitude: req.start.lat,
            start_longitude: req.start.lon,
            end_latitude: req.end.lat,
            end_longitude: req.end.lon,
        }
    }
}

impl TryFrom<RouteRequestBody> for RouteRequest {
    type Error = ValidationError;

    fn try_from(body: RouteRequestBody) -> Result<Self, Self::Error> {
        Ok(Self {
            start: GeoPoint::new(body.start_latitude, body.start_longitude)?,
            end: GeoPoint::new(body.end_latitude, body.end_longitude)?,
        })
    }
}

/// Success body of `POST /route/calculate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub path: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(
        default,
        rename = "estimatedTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RouteBounds {
    pub fn from_path(path: &[GeoPoint]) -> Option<Self> {
        let (first, rest) = path.split_first()?;
        let seed = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(rest.iter().fold(seed, |acc, p| Self {
            min_lat: acc.min_lat.min(p.lat),
            max_lat: acc.max_lat.max(p.lat),
            min_lon: acc.min_lon.min(p.lon),
            max_lon: acc.max_lon.max(p.lon),
        }))
    }

    /// True when the region has no area, e.g. every point identical.
    pub fn is_degenerate(&self) -> bool {
        self.max_lat <= self.min_lat || self.max_lon <= self.min_lon
    }
}

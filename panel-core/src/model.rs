use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// Body of `GET /api/hello`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub message: String,
    /// ISO8601 server time, kept verbatim so a malformed value can still be shown.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// One observation of the primary resource.
///
/// `is_stale` is only ever true when `payload` was read back from the cache slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub payload: HelloPayload,
    pub fetched_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl FetchResult {
    pub fn fresh(payload: HelloPayload, fetched_at: DateTime<Utc>) -> Self {
        Self { payload, fetched_at, is_stale: false }
    }

    pub fn cached(payload: HelloPayload, fetched_at: DateTime<Utc>) -> Self {
        Self { payload, fetched_at, is_stale: true }
    }
}

/// What a single primary fetch invocation produced after the failure policy ran.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fresh(FetchResult),
    Cached { result: FetchResult, cause: String },
    Failed { cause: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationCoords {
    pub lat: f64,
    pub lng: f64,
}

impl LocationCoords {
    pub fn new(lat: f64, lng: f64) -> Result<Self, LocationError> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);

        if !valid {
            return Err(LocationError::InvalidCoordinates { lat, lng });
        }

        Ok(Self { lat, lng })
    }

    /// Four decimal places, the precision shown to the user.
    pub fn display(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Result of a successful reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl LocationInfo {
    /// "City, Country", either half alone, or `None` when the lookup found neither.
    pub fn place_name(&self) -> Option<String> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(city), None) => Some(city.to_string()),
            (None, Some(country)) => Some(country.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSource {
    Primary,
    Cache,
    Location,
}

impl ErrorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSource::Primary => "primary",
            ErrorSource::Cache => "cache",
            ErrorSource::Location => "location",
        }
    }
}

impl std::fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub message: String,
    pub source: ErrorSource,
}

impl ErrorState {
    pub fn new(source: ErrorSource, message: impl Into<String>) -> Self {
        Self { message: message.into(), source }
    }
}

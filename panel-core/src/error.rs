use thiserror::Error;

/// Failures of the primary JSON resource.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// `body` is truncated and only carried for logging.
    #[error("server responded with HTTP {status}")]
    Status { status: u16, body: String },

    #[error("unexpected content type '{0}'")]
    ContentType(String),

    #[error("malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures of geolocation and reverse geocoding. Never escalates into `NetworkError`.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location capability unsupported")]
    Unsupported,

    #[error("location request timed out")]
    Timeout,

    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("reverse geocoding failed: {0}")]
    Geocoder(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LocationError::Timeout
        } else {
            LocationError::Geocoder(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("image request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("image request returned HTTP {0}")]
    Status(u16),

    #[error("resource is not an image (content type '{0}')")]
    NotAnImage(String),
}

/// Keeps error bodies readable in a one-line banner.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

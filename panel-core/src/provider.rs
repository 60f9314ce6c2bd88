//! Remote collaborators of the panel, each behind an async trait so the
//! controller can run against fakes.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{ImageLoadError, LocationError, NetworkError},
    model::{HelloPayload, LocationCoords, LocationInfo},
};

pub mod hello;
pub mod map_image;
pub mod nominatim;

pub use hello::HttpDataSource;
pub use map_image::HttpImageProbe;
pub use nominatim::NominatimGeocoder;

/// The primary JSON resource.
#[async_trait]
pub trait DataSource: Send + Sync + Debug {
    async fn fetch_payload(&self) -> Result<HelloPayload, NetworkError>;
}

/// Coordinates to place names.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    async fn reverse(&self, coords: LocationCoords) -> Result<LocationInfo, LocationError>;
}

/// Reports when the map image behind a URL has finished loading.
#[async_trait]
pub trait ImageLoadObserver: Send + Sync + Debug {
    async fn wait_loaded(&self, url: &str) -> Result<(), ImageLoadError>;
}

/// `true` for `application/json` and `+json` media types.
pub(crate) fn is_json_content_type(value: &str) -> bool {
    let media = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    media == "application/json" || media.ends_with("+json")
}

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;

use crate::{
    error::{LocationError, truncate_body},
    model::{LocationCoords, LocationInfo},
};

use super::ReverseGeocoder;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Reverse geocoding through a Nominatim-compatible `/reverse` endpoint.
///
/// Nominatim's usage policy requires every request to identify the application,
/// so an empty user agent is rejected up front.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    reverse_url: String,
    user_agent: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: impl Into<String>) -> Result<Self, LocationError> {
        let user_agent = user_agent.into();
        if user_agent.trim().is_empty() {
            return Err(LocationError::Geocoder(
                "a User-Agent identifying the application is required".to_string(),
            ));
        }

        Ok(Self {
            reverse_url: format!("{}/reverse", base_url.trim_end_matches('/')),
            user_agent,
            http: Client::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for LocationInfo {
    fn from(addr: NominatimAddress) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        LocationInfo {
            city: non_empty(addr.city)
                .or_else(|| non_empty(addr.town))
                .or_else(|| non_empty(addr.village)),
            country: non_empty(addr.country),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, coords: LocationCoords) -> Result<LocationInfo, LocationError> {
        let res = self
            .http
            .get(&self.reverse_url)
            .header(header::USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coords.lat.to_string()),
                ("lon", coords.lng.to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(LocationError::Geocoder(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_body(&body)
            )));
        }

        let parsed: NominatimResponse = serde_json::from_str(&body)
            .map_err(|e| LocationError::Geocoder(format!("malformed response: {e}")))?;

        let info = parsed.address.map(LocationInfo::from).unwrap_or_default();
        tracing::info!(city = ?info.city, country = ?info.country, "Reverse geocoded location");
        Ok(info)
    }
}

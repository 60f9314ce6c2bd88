//! Render reconciler: a pure mapping from [`ViewState`] to what the host draws.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    model::LocationCoords,
    state::{MapImageStatus, ViewState},
};

pub const DEFAULT_MAP_URL_TEMPLATE: &str = concat!(
    "https://static-maps.yandex.ru/1.x/",
    "?ll={lng},{lat}&z=10&size=300,150&l=map&pt={lng},{lat},pm2blm"
);

/// A map image URL with `{lat}` and `{lng}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTemplate(String);

impl MapTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{lat}") || !template.contains("{lng}") {
            return Err(anyhow!(
                "Map URL template must contain both {{lat}} and {{lng}} placeholders: {template}"
            ));
        }
        Ok(Self(template))
    }

    pub fn url(&self, coords: LocationCoords) -> String {
        self.0
            .replace("{lat}", &coords.lat.to_string())
            .replace("{lng}", &coords.lng.to_string())
    }
}

impl Default for MapTemplate {
    fn default() -> Self {
        Self(DEFAULT_MAP_URL_TEMPLATE.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Zone the server timestamp is displayed in.
    pub server_timezone: Tz,
    pub map: MapTemplate,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { server_timezone: chrono_tz::Europe::London, map: MapTemplate::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPanel {
    pub message: String,
    pub server_time: String,
    pub environment: Option<String>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    pub retry: Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapImage {
    /// Shown until the image itself reports it has loaded.
    Placeholder { url: String },
    Ready { url: String },
    Unavailable { url: String },
}

impl MapImage {
    pub fn url(&self) -> &str {
        match self {
            MapImage::Placeholder { url }
            | MapImage::Ready { url }
            | MapImage::Unavailable { url } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPanel {
    /// Place name when the reverse lookup produced one.
    pub place: Option<String>,
    pub coordinates: String,
    pub map: MapImage,
}

impl LocationPanel {
    /// Place name if resolved, raw coordinates otherwise.
    pub fn headline(&self) -> &str {
        self.place.as_deref().unwrap_or(&self.coordinates)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub refresh: Button,
    pub last_updated: Option<DateTime<Utc>>,
    pub loading_placeholder: bool,
    pub data: Option<DataPanel>,
    pub error: Option<ErrorBanner>,
    pub location: Option<LocationPanel>,
}

pub fn render(state: &ViewState, options: &RenderOptions) -> ViewModel {
    let refresh = Button {
        label: if state.loading { "Refreshing..." } else { "Refresh data" },
        enabled: !state.loading,
    };

    let data = state.data.as_ref().map(|result| DataPanel {
        message: result.payload.message.clone(),
        server_time: format_server_time(&result.payload.timestamp, options.server_timezone),
        environment: result.payload.environment.clone(),
        stale: result.is_stale,
    });

    let error = state.error.as_ref().map(|error| ErrorBanner {
        message: error.message.clone(),
        retry: Button { label: "Retry", enabled: !state.loading },
    });

    let location = state.coords.map(|coords| {
        let url = options.map.url(coords);
        LocationPanel {
            place: state.place.as_ref().and_then(|info| info.place_name()),
            coordinates: coords.display(),
            map: match state.map_image {
                MapImageStatus::Pending => MapImage::Placeholder { url },
                MapImageStatus::Loaded => MapImage::Ready { url },
                MapImageStatus::Failed => MapImage::Unavailable { url },
            },
        }
    });

    ViewModel {
        refresh,
        last_updated: state.last_updated,
        loading_placeholder: state.loading && data.is_none(),
        data,
        error,
        location,
    }
}

/// `dd/mm/yyyy, HH:MM` in `tz`; unparsable input is reported, not hidden.
pub fn format_server_time(timestamp: &str, tz: Tz) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&tz).format("%d/%m/%Y, %H:%M").to_string(),
        Err(_) => "Invalid date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{ErrorSource, ErrorState, FetchResult, HelloPayload, LocationInfo},
        state::{Event, reduce},
    };

    fn payload(message: &str) -> HelloPayload {
        HelloPayload {
            message: message.to_string(),
            timestamp: "2024-07-01T12:30:00Z".to_string(),
            environment: Some("production".to_string()),
        }
    }

    fn state_with_coords() -> ViewState {
        let state = reduce(ViewState::default(), Event::Mounted);
        reduce(state, Event::LocationAcquired(LocationCoords::new(55.7558, 37.6173).unwrap()))
    }

    #[test]
    fn server_time_uses_london_summer_time() {
        assert_eq!(
            format_server_time("2024-07-01T12:30:00Z", chrono_tz::Europe::London),
            "01/07/2024, 13:30"
        );
        assert_eq!(
            format_server_time("2024-01-01T00:00:00Z", chrono_tz::Europe::London),
            "01/01/2024, 00:00"
        );
    }

    #[test]
    fn server_time_flags_garbage() {
        assert_eq!(format_server_time("yesterday", chrono_tz::UTC), "Invalid date");
    }

    #[test]
    fn map_template_requires_placeholders() {
        assert!(MapTemplate::new("https://maps.example/?ll={lng},{lat}").is_ok());
        assert!(MapTemplate::new("https://maps.example/?ll={lng}").is_err());
    }

    #[test]
    fn default_map_url_puts_longitude_first() {
        let url = MapTemplate::default().url(LocationCoords::new(10.5, 20.25).unwrap());
        assert!(url.contains("ll=20.25,10.5"));
        assert!(url.contains("pt=20.25,10.5,pm2blm"));
    }

    #[test]
    fn loading_without_data_shows_placeholder_and_disables_refresh() {
        let state = ViewState { mounted: true, loading: true, ..Default::default() };
        let view = render(&state, &RenderOptions::default());

        assert!(view.loading_placeholder);
        assert!(!view.refresh.enabled);
        assert_eq!(view.refresh.label, "Refreshing...");
        assert!(view.data.is_none());
    }

    #[test]
    fn stale_data_is_annotated_alongside_error() {
        let state = ViewState {
            mounted: true,
            data: Some(FetchResult::cached(payload("hi"), Utc::now())),
            error: Some(ErrorState::new(ErrorSource::Cache, "using cached data: HTTP 500")),
            ..Default::default()
        };
        let view = render(&state, &RenderOptions::default());

        let data = view.data.expect("data panel");
        assert!(data.stale);
        assert_eq!(data.message, "hi");
        assert_eq!(data.server_time, "01/07/2024, 13:30");
        let error = view.error.expect("error banner");
        assert!(error.retry.enabled);
        assert!(!view.loading_placeholder);
    }

    #[test]
    fn retry_is_inert_while_loading() {
        let state = ViewState {
            mounted: true,
            loading: true,
            error: Some(ErrorState::new(ErrorSource::Primary, "HTTP 500")),
            ..Default::default()
        };
        let view = render(&state, &RenderOptions::default());
        assert!(!view.error.expect("error banner").retry.enabled);
    }

    #[test]
    fn no_location_panel_without_coordinates() {
        let state = ViewState {
            mounted: true,
            location_error: Some(ErrorState::new(ErrorSource::Location, "denied")),
            data: Some(FetchResult::fresh(payload("ok"), Utc::now())),
            ..Default::default()
        };
        let view = render(&state, &RenderOptions::default());

        assert!(view.location.is_none());
        assert!(view.data.is_some());
    }

    #[test]
    fn location_panel_falls_back_to_coordinates() {
        let view = render(&state_with_coords(), &RenderOptions::default());
        let panel = view.location.expect("location panel");

        assert_eq!(panel.place, None);
        assert_eq!(panel.headline(), "55.7558, 37.6173");
        assert!(matches!(panel.map, MapImage::Placeholder { .. }));
    }

    #[test]
    fn map_is_ready_only_after_image_loaded() {
        let state = reduce(state_with_coords(), Event::LocationResolved(LocationInfo {
            city: Some("Moscow".into()),
            country: Some("Russia".into()),
        }));
        let state = reduce(state, Event::MapImageLoaded);
        let panel = render(&state, &RenderOptions::default()).location.expect("location panel");

        assert_eq!(panel.headline(), "Moscow, Russia");
        assert!(matches!(panel.map, MapImage::Ready { .. }));
        assert!(panel.map.url().contains("37.6173,55.7558"));
    }
}

//! Plain-text drawing of a [`ViewModel`].

use chrono::Local;
use panel_core::{
    Config,
    view::{MapImage, ViewModel},
};
use std::fmt::Write;

pub fn panel(view: &ViewModel, config: &Config) -> String {
    let mut out = String::new();

    let updated = view
        .last_updated
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let button = if view.refresh.enabled {
        format!("[{}]", view.refresh.label)
    } else {
        format!("({})", view.refresh.label)
    };
    let _ = writeln!(out, "{button}  Last updated: {updated}");
    let _ = writeln!(out);

    if view.loading_placeholder {
        let _ = writeln!(out, "Loading data...");
    }

    if let Some(error) = &view.error {
        let retry = if error.retry.enabled { "  [Retry: press Enter]" } else { "" };
        let _ = writeln!(out, "Error: {}{retry}", error.message);
    }

    if let Some(data) = &view.data {
        let stale = if data.stale { "  (cached)" } else { "" };
        let _ = writeln!(out, "{}{stale}", data.message);
        let _ = writeln!(out, "Server time ({}): {}", config.server_timezone, data.server_time);
        if let Some(env) = &data.environment {
            let _ = writeln!(out, "Environment: {env}");
        }
    }

    if let Some(location) = &view.location {
        let _ = writeln!(out);
        let _ = writeln!(out, "Your location: {}", location.headline());
        if location.place.is_some() {
            let _ = writeln!(out, "Coordinates: {}", location.coordinates);
        }
        let map = match &location.map {
            MapImage::Placeholder { .. } => "loading...".to_string(),
            MapImage::Ready { url } => url.clone(),
            MapImage::Unavailable { .. } => "unavailable".to_string(),
        };
        let _ = writeln!(out, "Map: {map}");
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::view::{Button, DataPanel, ErrorBanner, LocationPanel};

    fn base() -> ViewModel {
        ViewModel {
            refresh: Button { label: "Refresh data", enabled: true },
            last_updated: None,
            loading_placeholder: false,
            data: None,
            error: None,
            location: None,
        }
    }

    #[test]
    fn error_without_data_shows_retry() {
        let view = ViewModel {
            error: Some(ErrorBanner {
                message: "server responded with HTTP 500".into(),
                retry: Button { label: "Retry", enabled: true },
            }),
            ..base()
        };

        let text = panel(&view, &Config::default());
        assert!(text.contains("Error: server responded with HTTP 500  [Retry: press Enter]"));
        assert!(text.contains("Last updated: never"));
    }

    #[test]
    fn stale_data_and_pending_map() {
        let view = ViewModel {
            data: Some(DataPanel {
                message: "hi".into(),
                server_time: "01/01/2024, 00:00".into(),
                environment: None,
                stale: true,
            }),
            location: Some(LocationPanel {
                place: None,
                coordinates: "51.5000, -0.1200".into(),
                map: MapImage::Placeholder { url: "https://maps.example".into() },
            }),
            ..base()
        };

        let text = panel(&view, &Config::default());
        assert!(text.contains("hi  (cached)"));
        assert!(text.contains("Server time (Europe/London): 01/01/2024, 00:00"));
        assert!(text.contains("Your location: 51.5000, -0.1200"));
        assert!(text.contains("Map: loading..."));
        assert!(!text.contains("Coordinates:"));
    }
}

//! Shared harness for the wiremock-backed integration tests.
#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use panel_core::{
    CacheSlot, Collaborators, ConfiguredLocation, HelloPayload, HttpDataSource, HttpImageProbe,
    KeyValueStore, LocationCoords, LocationResolver, ManualScheduler, MemoryStore,
    NominatimGeocoder, PrimaryFetcher, RenderOptions, StatusController, ViewState,
    view::MapTemplate,
};
use tokio::sync::watch;
use wiremock::MockServer;

pub const CACHE_KEY: &str = "test.last_payload";
pub const USER_AGENT: &str = "panel-tests/1.0";

pub fn hello_json(message: &str, timestamp: &str) -> serde_json::Value {
    serde_json::json!({
        "message": message,
        "timestamp": timestamp,
        "environment": "test"
    })
}

pub fn payload(message: &str) -> HelloPayload {
    HelloPayload {
        message: message.to_string(),
        timestamp: "2024-01-01T00:00:00Z".to_string(),
        environment: None,
    }
}

pub fn london() -> LocationCoords {
    LocationCoords::new(51.5, -0.12).expect("valid coordinates")
}

pub struct Harness {
    pub controller: StatusController,
    pub scheduler: ManualScheduler,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    /// Primary API, geocoder and map tiles all served by `server`.
    pub fn new(server: &MockServer, location: ConfiguredLocation) -> Self {
        Self::with_store(server, location, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(
        server: &MockServer,
        location: ConfiguredLocation,
        store: Arc<MemoryStore>,
    ) -> Self {
        let scheduler = ManualScheduler::new();
        let kv: Arc<dyn KeyValueStore> = store.clone();

        let deps = Collaborators {
            fetcher: PrimaryFetcher::new(
                Arc::new(HttpDataSource::new(&server.uri())),
                CacheSlot::new(kv, CACHE_KEY),
            ),
            resolver: LocationResolver::new(
                Arc::new(location),
                Arc::new(NominatimGeocoder::new(&server.uri(), USER_AGENT).expect("geocoder")),
            ),
            image_observer: Arc::new(HttpImageProbe::new()),
            scheduler: Arc::new(scheduler.clone()),
        };

        let render = RenderOptions {
            map: MapTemplate::new(format!("{}/map?ll={{lng}},{{lat}}", server.uri()))
                .expect("map template"),
            ..RenderOptions::default()
        };

        let controller = StatusController::new(deps, render, Duration::from_secs(30));
        Self { controller, scheduler, store }
    }

    pub fn cache(&self) -> CacheSlot {
        CacheSlot::new(self.store.clone(), CACHE_KEY)
    }
}

/// Waits until the controller publishes a state matching `pred`.
pub async fn wait_for(
    rx: &mut watch::Receiver<ViewState>,
    pred: impl Fn(&ViewState) -> bool,
) -> ViewState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if pred(&*state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("controller dropped");
        }
    })
    .await
    .expect("timed out waiting for state")
}

/// Settled = mounted, at least one fetch issued and nothing loading.
pub fn fetch_settled(state: &ViewState) -> bool {
    state.mounted && state.issued_seq > 0 && !state.loading
}

//! Core library for the `panel` status display.
//!
//! This crate defines:
//! - The primary fetcher with its cache-slot fallback
//! - Two-phase location resolution (coordinates, then place name)
//! - Capability traits for the network, storage, scheduling and image loading
//! - A reducer-driven view state and the render reconciler over it
//! - `StatusController`, which wires all of the above together
//!
//! It is used by `panel-cli`, but any host that can run tokio can mount a controller.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod provider;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod view;

pub use config::{Config, LocationConfig};
pub use controller::{Collaborators, FetchTrigger, StatusController};
pub use error::{ImageLoadError, LocationError, NetworkError, StoreError};
pub use fetcher::PrimaryFetcher;
pub use location::{ConfiguredLocation, LocationProvider, LocationResolver};
pub use model::{
    ErrorSource, ErrorState, FetchOutcome, FetchResult, HelloPayload, LocationCoords, LocationInfo,
};
pub use provider::{
    DataSource, HttpDataSource, HttpImageProbe, ImageLoadObserver, NominatimGeocoder,
    ReverseGeocoder,
};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use state::{Event, MapImageStatus, ViewState};
pub use store::{CacheSlot, FileStore, KeyValueStore, MemoryStore};
pub use view::{RenderOptions, ViewModel};

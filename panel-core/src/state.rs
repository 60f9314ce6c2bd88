//! View state and the reducer that is its only mutation path.
//!
//! Each asynchronous completion is delivered as one [`Event`] and applied
//! atomically by [`reduce`]. Two guards live here:
//!
//! - nothing but [`Event::Mounted`] has any effect while the view is unmounted;
//! - a fetch completion is applied only if it belongs to the most recently
//!   started fetch, so a slow older response can never overwrite a newer one.

use chrono::{DateTime, Utc};

use crate::{
    fetcher::CACHED_PREFIX,
    model::{ErrorSource, ErrorState, FetchOutcome, FetchResult, LocationCoords, LocationInfo},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapImageStatus {
    #[default]
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub mounted: bool,
    /// Incremented on every mount; completions from an earlier mount carry a stale epoch.
    pub epoch: u64,
    pub loading: bool,
    /// Sequence number of the most recently started fetch.
    pub issued_seq: u64,
    pub data: Option<FetchResult>,
    /// Time of the last fresh success.
    pub last_updated: Option<DateTime<Utc>>,
    /// Primary resource error, `Primary` or `Cache` sourced.
    pub error: Option<ErrorState>,
    pub coords: Option<LocationCoords>,
    pub place: Option<LocationInfo>,
    pub location_error: Option<ErrorState>,
    pub map_image: MapImageStatus,
}

impl ViewState {
    pub fn next_seq(&self) -> u64 {
        self.issued_seq + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mounted,
    Unmounted,
    FetchStarted { seq: u64 },
    FetchCompleted { seq: u64, outcome: FetchOutcome },
    LocationAcquired(LocationCoords),
    LocationResolved(LocationInfo),
    LocationFailed(String),
    MapImageLoaded,
    MapImageFailed(String),
}

pub fn reduce(mut state: ViewState, event: Event) -> ViewState {
    if !state.mounted && event != Event::Mounted {
        tracing::trace!(?event, "Ignoring event for unmounted view");
        return state;
    }

    match event {
        Event::Mounted => {
            if !state.mounted {
                // A remount is a fresh view. It reserves one sequence number so
                // no fetch still in flight from the previous mount can match.
                let issued_seq =
                    if state.epoch > 0 { state.issued_seq + 1 } else { state.issued_seq };
                state = ViewState {
                    mounted: true,
                    epoch: state.epoch + 1,
                    issued_seq,
                    ..ViewState::default()
                };
            }
        }
        Event::Unmounted => {
            state.mounted = false;
            state.loading = false;
        }
        Event::FetchStarted { seq } => {
            if seq > state.issued_seq {
                state.issued_seq = seq;
                state.loading = true;
            }
        }
        Event::FetchCompleted { seq, outcome } => {
            if seq != state.issued_seq {
                tracing::warn!(seq, latest = state.issued_seq, "Discarding superseded fetch");
                return state;
            }

            state.loading = false;
            match outcome {
                FetchOutcome::Fresh(result) => {
                    state.last_updated = Some(result.fetched_at);
                    state.data = Some(result);
                    state.error = None;
                }
                FetchOutcome::Cached { result, cause } => {
                    state.data = Some(result);
                    let message = format!("{CACHED_PREFIX}{cause}");
                    state.error = Some(ErrorState::new(ErrorSource::Cache, message));
                }
                FetchOutcome::Failed { cause } => {
                    state.data = None;
                    state.error = Some(ErrorState::new(ErrorSource::Primary, cause));
                }
            }
        }
        Event::LocationAcquired(coords) => {
            if state.coords.is_none() {
                state.coords = Some(coords);
                state.map_image = MapImageStatus::Pending;
            }
        }
        Event::LocationResolved(info) => {
            state.place = Some(info);
            state.location_error = None;
        }
        Event::LocationFailed(message) => {
            state.location_error = Some(ErrorState::new(ErrorSource::Location, message));
        }
        Event::MapImageLoaded => {
            if state.coords.is_some() {
                state.map_image = MapImageStatus::Loaded;
            }
        }
        Event::MapImageFailed(message) => {
            if state.coords.is_some() {
                tracing::debug!("Map image failed: {}", message);
                state.map_image = MapImageStatus::Failed;
            }
        }
    }

    state
}

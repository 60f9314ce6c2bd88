//! Two-phase location resolution: device coordinates, then a place name.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::LocationError,
    model::{LocationCoords, LocationInfo},
    provider::ReverseGeocoder,
};

/// Permission-gated source of device coordinates.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn current_position(&self) -> Result<LocationCoords, LocationError>;
}

/// Coordinates supplied by configuration or the command line.
///
/// `enabled = false` behaves like a denied permission prompt; no coordinates
/// behaves like a host without a location capability.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredLocation {
    enabled: bool,
    coords: Option<LocationCoords>,
}

impl ConfiguredLocation {
    pub fn new(enabled: bool, coords: Option<LocationCoords>) -> Self {
        Self { enabled, coords }
    }

    pub fn denied() -> Self {
        Self::new(false, None)
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn current_position(&self) -> Result<LocationCoords, LocationError> {
        if !self.enabled {
            return Err(LocationError::PermissionDenied);
        }
        self.coords.ok_or(LocationError::Unsupported)
    }
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self { provider, geocoder }
    }

    /// Phase 1. Coordinates from the provider are range-checked again.
    pub async fn coordinates(&self) -> Result<LocationCoords, LocationError> {
        let coords = self.provider.current_position().await?;
        LocationCoords::new(coords.lat, coords.lng)
    }

    /// Phase 2.
    pub async fn describe(&self, coords: LocationCoords) -> Result<LocationInfo, LocationError> {
        self.geocoder.reverse(coords).await
    }

    /// Both phases; a phase 1 failure skips the lookup.
    pub async fn resolve(&self) -> Result<(LocationCoords, LocationInfo), LocationError> {
        let coords = self.coordinates().await?;
        let info = self.describe(coords).await?;
        Ok((coords, info))
    }
}

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    services::{distance::DistanceLookup, store::TripStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: TripStore,
    pub distance: Option<Arc<dyn DistanceLookup>>,
    pub rate_per_mile: f64,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: TripStore,
        distance: Option<Arc<dyn DistanceLookup>>,
        rate_per_mile: f64,
    ) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            store,
            distance,
            rate_per_mile,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

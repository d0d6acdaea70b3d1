use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::trip::RouteLeg;

pub const METERS_PER_MILE: f64 = 1609.344;

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(12);
const DIRECTIONS_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("route lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no match found for address {address:?}")]
    NoResult { address: String },
    #[error("unexpected response from route service: {0}")]
    Malformed(String),
}

// The handlers only see this trait; tests swap in canned implementations.
#[async_trait]
pub trait DistanceLookup: Send + Sync {
    async fn distance_miles(&self, from: &str, to: &str) -> Result<f64, LookupError>;
}

#[derive(Debug, Clone)]
pub struct OrsDistanceClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OrsDistanceClient {
    pub fn new(http: Client, base_url: &Url, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    // ORS coordinates are [longitude, latitude].
    async fn geocode(&self, address: &str) -> Result<[f64; 2], LookupError> {
        let response = self
            .http
            .get(format!("{}/geocode/search", self.base_url))
            .header(AUTHORIZATION, self.api_key.as_str())
            .query(&[("text", address), ("size", "1")])
            .timeout(GEOCODE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        let feature = body
            .features
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NoResult {
                address: address.to_string(),
            })?;
        let coords = feature.geometry.coordinates;
        if coords.len() < 2 {
            return Err(LookupError::Malformed(format!(
                "geocode result for {address:?} has no coordinates"
            )));
        }
        Ok([coords[0], coords[1]])
    }

    async fn directions_meters(&self, from: [f64; 2], to: [f64; 2]) -> Result<f64, LookupError> {
        let response = self
            .http
            .post(format!("{}/v2/directions/driving-car/geojson", self.base_url))
            .header(AUTHORIZATION, self.api_key.as_str())
            .json(&DirectionsRequest {
                coordinates: &[from, to],
            })
            .timeout(DIRECTIONS_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let body: DirectionsResponse = response.json().await?;
        let feature = body
            .features
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::Malformed("route response carried no features".into()))?;
        Ok(feature.properties.summary.distance)
    }
}

#[async_trait]
impl DistanceLookup for OrsDistanceClient {
    async fn distance_miles(&self, from: &str, to: &str) -> Result<f64, LookupError> {
        let from_point = self.geocode(from).await?;
        let to_point = self.geocode(to).await?;
        let meters = self.directions_meters(from_point, to_point).await?;
        Ok(meters / METERS_PER_MILE)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest<'a> {
    coordinates: &'a [[f64; 2]],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<RouteFeature>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    properties: RouteProperties,
}

#[derive(Debug, Deserialize)]
struct RouteProperties {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    // meters
    distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub legs: Vec<RouteLeg>,
    pub total_miles: f64,
}

pub async fn route_estimate(
    lookup: &dyn DistanceLookup,
    points: &[String],
) -> Result<RouteEstimate, LookupError> {
    let mut legs = Vec::new();
    let mut total_miles = 0.0;
    for pair in points.windows(2) {
        let miles = lookup.distance_miles(&pair[0], &pair[1]).await?;
        total_miles += miles;
        legs.push(RouteLeg {
            from_address: pair[0].clone(),
            to_address: pair[1].clone(),
            miles,
        });
    }
    Ok(RouteEstimate { legs, total_miles })
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::calc;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("start address is required")]
    MissingStartAddress,
    #[error("end address is required")]
    MissingEndAddress,
    #[error("stop {index} has an arrival time but no address")]
    StopMissingAddress { index: usize },
    #[error("{field} is not a valid date/time")]
    InvalidTimestamp { field: String },
    #[error("{field} is not a valid amount")]
    InvalidAmount { field: String },
    #[error("{field} cannot be negative")]
    NegativeAmount { field: String },
    #[error("total miles must be greater than zero (enter manual miles or enable distance lookup)")]
    NonPositiveMiles,
    #[error("total miles is too large to be a real trip")]
    ExcessiveMiles,
    #[error("a citation needs a description")]
    CitationMissingDescription,
    #[error("a citation needs an amount greater than zero")]
    CitationMissingAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TripKind {
    #[default]
    #[serde(rename = "one_way")]
    OneWay,
    #[serde(rename = "roundtrip")]
    RoundTrip,
}

impl TripKind {
    pub fn label(&self) -> &'static str {
        match self {
            TripKind::OneWay => "One way",
            TripKind::RoundTrip => "Round trip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceSource {
    #[serde(rename = "openrouteservice")]
    OpenRouteService,
    #[serde(rename = "manual")]
    Manual,
}

impl DistanceSource {
    pub fn label(&self) -> &'static str {
        match self {
            DistanceSource::OpenRouteService => "OpenRouteService",
            DistanceSource::Manual => "Manual entry",
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub arrived_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from_address: String,
    pub to_address: String,
    pub miles: f64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub amount: f64,
    pub description: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub department: Option<String>,
    pub citing_officer: Option<String>,
    pub ticket_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Costs {
    pub gas: f64,
    pub food: f64,
    pub tolls: f64,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl Costs {
    pub fn citation_total(&self) -> f64 {
        self.citations.iter().map(|c| c.amount).sum()
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub kind: TripKind,
    pub start_address: String,
    pub end_address: String,
    pub departed_at: Option<NaiveDateTime>,
    pub arrived_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    pub rate_per_mile: f64,
    pub one_way_miles: f64,
    pub total_miles: f64,
    pub reimbursement: f64,
    pub distance_source: DistanceSource,
    #[serde(default)]
    pub route_legs: Vec<RouteLeg>,
    #[serde(default)]
    pub costs: Costs,
}

impl TripRecord {
    pub fn from_draft(
        id: String,
        draft: TripDraft,
        one_way_miles: f64,
        distance_source: DistanceSource,
        route_legs: Vec<RouteLeg>,
        rate_per_mile: f64,
    ) -> Self {
        let one_way_miles = calc::round2(one_way_miles);
        let total_miles = match draft.kind {
            TripKind::RoundTrip => calc::round2(one_way_miles * 2.0),
            TripKind::OneWay => one_way_miles,
        };
        // Stops apply to both directions of a round trip; they are stored once.
        Self {
            id,
            created_at: Utc::now(),
            kind: draft.kind,
            start_address: draft.start_address,
            end_address: draft.end_address,
            departed_at: draft.departed_at,
            arrived_at: draft.arrived_at,
            stops: draft.stops,
            rate_per_mile,
            one_way_miles,
            total_miles,
            reimbursement: calc::reimbursement(total_miles, rate_per_mile),
            distance_source,
            route_legs,
            costs: Costs::default(),
        }
    }

    // Reimbursement is derived state; call after any amendment so it never
    // drifts from total_miles * rate_per_mile.
    pub fn recompute_reimbursement(&mut self) {
        self.reimbursement = calc::reimbursement(self.total_miles, self.rate_per_mile);
    }
}

// Raw form input, exactly as submitted; validate() turns it into a TripDraft
// or reports the first problem found.
#[derive(Debug, Clone, Default)]
pub struct TripSubmission {
    pub kind: TripKind,
    pub start_address: String,
    pub end_address: String,
    pub departed_at: String,
    pub arrived_at: String,
    pub stops: Vec<StopRow>,
    pub manual_one_way_miles: String,
    pub manual_stop_miles: String,
}

#[derive(Debug, Clone, Default)]
pub struct StopRow {
    pub address: String,
    pub arrived_at: String,
}

#[derive(Debug, Clone)]
pub struct TripDraft {
    pub kind: TripKind,
    pub start_address: String,
    pub end_address: String,
    pub departed_at: Option<NaiveDateTime>,
    pub arrived_at: Option<NaiveDateTime>,
    pub stops: Vec<Stop>,
    pub manual_one_way_miles: f64,
    pub manual_stop_miles: f64,
}

impl TripSubmission {
    pub fn validate(self) -> Result<TripDraft, ValidationError> {
        let start_address = self.start_address.trim().to_string();
        if start_address.is_empty() {
            return Err(ValidationError::MissingStartAddress);
        }
        let end_address = self.end_address.trim().to_string();
        if end_address.is_empty() {
            return Err(ValidationError::MissingEndAddress);
        }

        let departed_at = parse_optional_datetime("departure time", &self.departed_at)?;
        let arrived_at = parse_optional_datetime("arrival time", &self.arrived_at)?;

        let mut stops = Vec::new();
        for (i, row) in self.stops.iter().enumerate() {
            let index = i + 1;
            let address = row.address.trim();
            let arrival_raw = row.arrived_at.trim();
            if address.is_empty() && arrival_raw.is_empty() {
                continue;
            }
            if address.is_empty() {
                return Err(ValidationError::StopMissingAddress { index });
            }
            let arrived_at =
                parse_optional_datetime(&format!("stop {index} arrival time"), arrival_raw)?;
            stops.push(Stop {
                address: address.to_string(),
                arrived_at,
            });
        }

        let manual_one_way_miles = parse_amount("manual miles", &self.manual_one_way_miles)?;
        let manual_stop_miles = parse_amount("extra stop miles", &self.manual_stop_miles)?;

        Ok(TripDraft {
            kind: self.kind,
            start_address,
            end_address,
            departed_at,
            arrived_at,
            stops,
            manual_one_way_miles,
            manual_stop_miles,
        })
    }
}

impl TripDraft {
    // Waypoints in driving order: start, stops, end.
    pub fn route_points(&self) -> Vec<String> {
        let mut points = Vec::with_capacity(self.stops.len() + 2);
        points.push(self.start_address.clone());
        points.extend(self.stops.iter().map(|s| s.address.clone()));
        points.push(self.end_address.clone());
        points
    }
}

#[derive(Debug, Clone, Default)]
pub struct CostsSubmission {
    pub gas: String,
    pub food: String,
    pub tolls: String,
    pub citation_amount: String,
    pub citation_description: String,
    pub citation_state: String,
    pub citation_county: String,
    pub citation_department: String,
    pub citation_officer: String,
    pub citation_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostsUpdate {
    pub gas: f64,
    pub food: f64,
    pub tolls: f64,
    pub citation: Option<Citation>,
}

impl CostsSubmission {
    pub fn validate(self) -> Result<CostsUpdate, ValidationError> {
        let gas = parse_amount("gas", &self.gas)?;
        let food = parse_amount("food", &self.food)?;
        let tolls = parse_amount("tolls", &self.tolls)?;

        let citation_fields = [
            self.citation_amount.trim(),
            self.citation_description.trim(),
            self.citation_state.trim(),
            self.citation_county.trim(),
            self.citation_department.trim(),
            self.citation_officer.trim(),
            self.citation_number.trim(),
        ];
        let citation = if citation_fields.iter().any(|f| !f.is_empty()) {
            let description = self.citation_description.trim();
            if description.is_empty() {
                return Err(ValidationError::CitationMissingDescription);
            }
            let amount_raw = self.citation_amount.trim();
            if amount_raw.is_empty() {
                return Err(ValidationError::CitationMissingAmount);
            }
            let amount = parse_amount("citation amount", amount_raw)?;
            if amount <= 0.0 {
                return Err(ValidationError::CitationMissingAmount);
            }
            Some(Citation {
                amount,
                description: description.to_string(),
                state: normalize_optional(&self.citation_state),
                county: normalize_optional(&self.citation_county),
                department: normalize_optional(&self.citation_department),
                citing_officer: normalize_optional(&self.citation_officer),
                ticket_number: normalize_optional(&self.citation_number),
            })
        } else {
            None
        };

        Ok(CostsUpdate {
            gas,
            food,
            tolls,
            citation,
        })
    }
}

impl CostsUpdate {
    // Full replacement of the spend fields; a submitted citation is appended.
    pub fn apply(self, costs: &mut Costs) {
        costs.gas = self.gas;
        costs.food = self.food;
        costs.tolls = self.tolls;
        if let Some(citation) = self.citation {
            costs.citations.push(citation);
        }
    }
}

// High enough for any real trip, low enough that round-trip doubling and
// cent rounding stay finite.
pub const MAX_TRIP_MILES: f64 = 1_000_000.0;

pub fn ensure_positive_miles(miles: f64) -> Result<(), ValidationError> {
    if !(miles > 0.0) {
        Err(ValidationError::NonPositiveMiles)
    } else if miles > MAX_TRIP_MILES {
        Err(ValidationError::ExcessiveMiles)
    } else {
        Ok(())
    }
}

fn parse_optional_datetime(
    field: &str,
    raw: &str,
) -> Result<Option<NaiveDateTime>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    // datetime-local inputs submit minutes, some browsers add seconds.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidTimestamp {
            field: field.to_string(),
        })
}

fn parse_amount(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = raw.parse().map_err(|_| ValidationError::InvalidAmount {
        field: field.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidAmount {
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeAmount {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

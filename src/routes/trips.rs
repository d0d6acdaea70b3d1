use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::{
    calc,
    error::AppError,
    flash::{self, FlashMessage},
    models::trip::{
        ensure_positive_miles, DistanceSource, StopRow, TripKind, TripRecord, TripSubmission,
    },
    services::distance::route_estimate,
    state::AppState,
};

pub const MAX_STOPS: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/mileage", get(mileage_form).post(mileage_submit))
        .route("/trips/:id", get(trip_detail))
        .route("/trips/:id/delete", post(trip_delete))
}

#[derive(Clone)]
struct TripRow {
    id: String,
    created_at: String,
    kind: &'static str,
    start_address: String,
    end_address: String,
    total_miles: String,
    reimbursement: String,
    total_cost: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    show_flash: bool,
    flash_kind: String,
    flash_message: String,
    rate: String,
    trips: Vec<TripRow>,
}

async fn index(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);
    let (show_flash, flash_kind, flash_message) = flash_parts(flash);

    let trips = state.store.load().await?;
    let rows = trips
        .iter()
        .map(|trip| TripRow {
            id: trip.id.clone(),
            created_at: format_timestamp(trip.created_at),
            kind: trip.kind.label(),
            start_address: trip.start_address.clone(),
            end_address: trip.end_address.clone(),
            total_miles: format!("{:.2}", trip.total_miles),
            reimbursement: format_money(trip.reimbursement),
            total_cost: format_money(calc::total_cost(trip)),
        })
        .collect();

    let template = IndexTemplate {
        show_flash,
        flash_kind,
        flash_message,
        rate: format!("{:.2}", state.rate_per_mile),
        trips: rows,
    };
    Ok((jar, AskamaTemplateResponse::into_response(template)).into_response())
}

#[derive(Template)]
#[template(path = "mileage.html")]
struct MileageTemplate {
    show_flash: bool,
    flash_kind: String,
    flash_message: String,
    rate: String,
    ors_enabled: bool,
    stop_rows: Vec<usize>,
}

async fn mileage_form(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);
    let (show_flash, flash_kind, flash_message) = flash_parts(flash);

    let template = MileageTemplate {
        show_flash,
        flash_kind,
        flash_message,
        rate: format!("{:.2}", state.rate_per_mile),
        ors_enabled: state.distance.is_some(),
        stop_rows: (1..=MAX_STOPS).collect(),
    };
    Ok((jar, AskamaTemplateResponse::into_response(template)).into_response())
}

#[derive(Deserialize)]
struct MileageForm {
    #[serde(default)]
    trip_type: TripKind,
    start_address: Option<String>,
    end_address: Option<String>,
    start_datetime: Option<String>,
    arrival_datetime: Option<String>,
    stop_1_address: Option<String>,
    stop_1_datetime: Option<String>,
    stop_2_address: Option<String>,
    stop_2_datetime: Option<String>,
    stop_3_address: Option<String>,
    stop_3_datetime: Option<String>,
    stop_4_address: Option<String>,
    stop_4_datetime: Option<String>,
    stop_5_address: Option<String>,
    stop_5_datetime: Option<String>,
    manual_one_way_miles: Option<String>,
    manual_stop_miles: Option<String>,
}

impl MileageForm {
    fn into_submission(self) -> TripSubmission {
        let stops = vec![
            StopRow {
                address: self.stop_1_address.unwrap_or_default(),
                arrived_at: self.stop_1_datetime.unwrap_or_default(),
            },
            StopRow {
                address: self.stop_2_address.unwrap_or_default(),
                arrived_at: self.stop_2_datetime.unwrap_or_default(),
            },
            StopRow {
                address: self.stop_3_address.unwrap_or_default(),
                arrived_at: self.stop_3_datetime.unwrap_or_default(),
            },
            StopRow {
                address: self.stop_4_address.unwrap_or_default(),
                arrived_at: self.stop_4_datetime.unwrap_or_default(),
            },
            StopRow {
                address: self.stop_5_address.unwrap_or_default(),
                arrived_at: self.stop_5_datetime.unwrap_or_default(),
            },
        ];
        TripSubmission {
            kind: self.trip_type,
            start_address: self.start_address.unwrap_or_default(),
            end_address: self.end_address.unwrap_or_default(),
            departed_at: self.start_datetime.unwrap_or_default(),
            arrived_at: self.arrival_datetime.unwrap_or_default(),
            stops,
            manual_one_way_miles: self.manual_one_way_miles.unwrap_or_default(),
            manual_stop_miles: self.manual_stop_miles.unwrap_or_default(),
        }
    }
}

async fn mileage_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<MileageForm>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let draft = match form.into_submission().validate() {
        Ok(draft) => draft,
        Err(err) => {
            return Ok((flash::danger(jar, err.to_string()), Redirect::to("/mileage")));
        }
    };

    // Measured miles win when the lookup covers the whole route; otherwise
    // the manual figure stands in. Extra stop miles always count on top.
    let (one_way_base, distance_source, route_legs) = match &state.distance {
        Some(lookup) => match route_estimate(lookup.as_ref(), &draft.route_points()).await {
            Ok(estimate) => (
                estimate.total_miles,
                DistanceSource::OpenRouteService,
                estimate.legs,
            ),
            Err(err) => {
                warn!(error = %err, "distance lookup failed, falling back to manual miles");
                (draft.manual_one_way_miles, DistanceSource::Manual, Vec::new())
            }
        },
        None => (draft.manual_one_way_miles, DistanceSource::Manual, Vec::new()),
    };
    let one_way_miles = one_way_base + draft.manual_stop_miles;

    if let Err(err) = ensure_positive_miles(one_way_miles) {
        return Ok((flash::danger(jar, err.to_string()), Redirect::to("/mileage")));
    }

    let record = TripRecord::from_draft(
        state.store.next_identifier(),
        draft,
        one_way_miles,
        distance_source,
        route_legs,
        state.rate_per_mile,
    );
    state.store.append(record).await?;

    Ok((flash::success(jar, "Trip saved."), Redirect::to("/")))
}

#[derive(Clone)]
struct StopView {
    address: String,
    arrived_at: String,
}

#[derive(Clone)]
struct LegView {
    from_address: String,
    to_address: String,
    miles: String,
}

#[derive(Clone)]
struct CitationView {
    amount: String,
    description: String,
    details: String,
}

#[derive(Template)]
#[template(path = "trip_detail.html")]
struct TripDetailTemplate {
    id: String,
    created_at: String,
    kind: &'static str,
    start_address: String,
    end_address: String,
    departed_at: String,
    arrived_at: String,
    stops: Vec<StopView>,
    rate: String,
    one_way_miles: String,
    total_miles: String,
    reimbursement: String,
    distance_source: &'static str,
    route_legs: Vec<LegView>,
    gas: String,
    food: String,
    tolls: String,
    citations: Vec<CitationView>,
    total_cost: String,
    raw_json: String,
}

async fn trip_detail(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let trip = state
        .store
        .find(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let raw_json =
        serde_json::to_string_pretty(&trip).map_err(|err| AppError::Other(err.into()))?;

    let stops = trip
        .stops
        .iter()
        .map(|stop| StopView {
            address: stop.address.clone(),
            arrived_at: stop
                .arrived_at
                .map(format_naive_timestamp)
                .unwrap_or_default(),
        })
        .collect();
    let route_legs = trip
        .route_legs
        .iter()
        .map(|leg| LegView {
            from_address: leg.from_address.clone(),
            to_address: leg.to_address.clone(),
            miles: format!("{:.2}", leg.miles),
        })
        .collect();
    let citations = trip
        .costs
        .citations
        .iter()
        .map(|citation| {
            let details: Vec<&str> = [
                citation.state.as_deref(),
                citation.county.as_deref(),
                citation.department.as_deref(),
                citation.citing_officer.as_deref(),
                citation.ticket_number.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect();
            CitationView {
                amount: format_money(citation.amount),
                description: citation.description.clone(),
                details: details.join(", "),
            }
        })
        .collect();

    Ok(AskamaTemplateResponse::into_response(TripDetailTemplate {
        id: trip.id.clone(),
        created_at: format_timestamp(trip.created_at),
        kind: trip.kind.label(),
        start_address: trip.start_address.clone(),
        end_address: trip.end_address.clone(),
        departed_at: trip
            .departed_at
            .map(format_naive_timestamp)
            .unwrap_or_default(),
        arrived_at: trip
            .arrived_at
            .map(format_naive_timestamp)
            .unwrap_or_default(),
        stops,
        rate: format!("{:.2}", trip.rate_per_mile),
        one_way_miles: format!("{:.2}", trip.one_way_miles),
        total_miles: format!("{:.2}", trip.total_miles),
        reimbursement: format_money(trip.reimbursement),
        distance_source: trip.distance_source.label(),
        route_legs,
        gas: format_money(trip.costs.gas),
        food: format_money(trip.costs.food),
        tolls: format_money(trip.costs.tolls),
        citations,
        total_cost: format_money(calc::total_cost(&trip)),
        raw_json,
    }))
}

async fn trip_delete(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(trip_id): Path<String>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    if state.store.delete(&trip_id).await? {
        Ok((flash::success(jar, "Trip deleted."), Redirect::to("/")))
    } else {
        Ok((flash::danger(jar, "Trip not found."), Redirect::to("/")))
    }
}

fn flash_parts(flash: Option<FlashMessage>) -> (bool, String, String) {
    match flash {
        Some(flash) => (true, flash.level.as_str().to_string(), flash.message),
        None => (false, String::new(), String::new()),
    }
}

fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as i64;
    let mut whole = (cents / 100).to_string();
    let mut insert_at = whole.len() as isize - 3;
    while insert_at > 0 {
        whole.insert(insert_at as usize, ',');
        insert_at -= 3;
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${whole}.{:02}", cents % 100)
}

fn format_timestamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_naive_timestamp(ts: chrono::NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

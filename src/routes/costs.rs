use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    response::{Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    calc,
    error::AppError,
    flash::{self, FlashMessage},
    models::trip::CostsSubmission,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/costs", get(costs_page).post(costs_submit))
}

#[derive(Clone)]
struct CostsRow {
    id: String,
    label: String,
    gas: String,
    food: String,
    tolls: String,
    citation_count: usize,
    citation_total: String,
    total_cost: String,
}

#[derive(Template)]
#[template(path = "costs.html")]
struct CostsTemplate {
    show_flash: bool,
    flash_kind: String,
    flash_message: String,
    trips: Vec<CostsRow>,
}

async fn costs_page(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);
    let (show_flash, flash_kind, flash_message) = flash_parts(flash);

    let trips = state.store.load().await?;
    let rows = trips
        .iter()
        .map(|trip| CostsRow {
            id: trip.id.clone(),
            label: format!(
                "{}: {} to {}",
                format_timestamp(trip.created_at),
                trip.start_address,
                trip.end_address
            ),
            gas: format_money(trip.costs.gas),
            food: format_money(trip.costs.food),
            tolls: format_money(trip.costs.tolls),
            citation_count: trip.costs.citations.len(),
            citation_total: format_money(trip.costs.citation_total()),
            total_cost: format_money(calc::total_cost(trip)),
        })
        .collect();

    let template = CostsTemplate {
        show_flash,
        flash_kind,
        flash_message,
        trips: rows,
    };
    Ok((jar, AskamaTemplateResponse::into_response(template)).into_response())
}

#[derive(Deserialize)]
struct CostsForm {
    trip_id: String,
    gas: Option<String>,
    food: Option<String>,
    tolls: Option<String>,
    citation_amount: Option<String>,
    citation_description: Option<String>,
    citation_state: Option<String>,
    citation_county: Option<String>,
    citation_department: Option<String>,
    citation_officer: Option<String>,
    citation_number: Option<String>,
}

async fn costs_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CostsForm>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let submission = CostsSubmission {
        gas: form.gas.unwrap_or_default(),
        food: form.food.unwrap_or_default(),
        tolls: form.tolls.unwrap_or_default(),
        citation_amount: form.citation_amount.unwrap_or_default(),
        citation_description: form.citation_description.unwrap_or_default(),
        citation_state: form.citation_state.unwrap_or_default(),
        citation_county: form.citation_county.unwrap_or_default(),
        citation_department: form.citation_department.unwrap_or_default(),
        citation_officer: form.citation_officer.unwrap_or_default(),
        citation_number: form.citation_number.unwrap_or_default(),
    };
    let update = match submission.validate() {
        Ok(update) => update,
        Err(err) => {
            return Ok((flash::danger(jar, err.to_string()), Redirect::to("/costs")));
        }
    };

    let Some(mut trip) = state.store.find(&form.trip_id).await? else {
        return Ok((flash::danger(jar, "Trip not found."), Redirect::to("/costs")));
    };
    update.apply(&mut trip.costs);
    trip.recompute_reimbursement();

    if state.store.replace(trip).await? {
        Ok((flash::success(jar, "Costs updated."), Redirect::to("/costs")))
    } else {
        Ok((flash::danger(jar, "Trip not found."), Redirect::to("/costs")))
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

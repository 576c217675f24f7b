use crate::calendar::DisplayMonth;
use crate::errors::AppError;
use crate::models::{
    CheckedMap, DateKey, MonthQuery, MonthResponse, Summary, ToggleRequest, ToggleResponse,
};
use crate::state::AppState;
use crate::summary::{build_month, build_summary};
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, Redirect,
    },
    Json,
};
use futures::{Stream, StreamExt};
use tracing::info;

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Html<String>, AppError> {
    let month = resolve_month(&query)?;
    let checked = state.store.snapshot().await;
    let view = build_month(month, state.epoch, &checked);
    let live = state.store.has_feed();
    Ok(Html(render_index(&view, live)))
}

pub async fn get_month(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, AppError> {
    let month = resolve_month(&query)?;
    let checked = state.store.snapshot().await;
    Ok(Json(build_month(month, state.epoch, &checked)))
}

pub async fn get_checked(State(state): State<AppState>) -> Json<CheckedMap> {
    Json(state.store.snapshot().await)
}

pub async fn get_summary(State(state): State<AppState>) -> Json<Summary> {
    let checked = state.store.snapshot().await;
    Json(build_summary(state.epoch, &checked))
}

pub async fn toggle(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let date = DateKey::parse(&payload.date)?;
    let checked = state.store.toggle(date.clone()).await;
    info!(date = %date, checked, "day toggled");

    let snapshot = state.store.snapshot().await;
    Ok(Json(ToggleResponse {
        date,
        checked,
        summary: build_summary(state.epoch, &snapshot),
    }))
}

pub async fn toggle_form(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<Redirect, AppError> {
    let date = DateKey::parse(&date)?;
    let month = resolve_month(&query)?;
    let checked = state.store.toggle(date.clone()).await;
    info!(date = %date, checked, "day toggled");
    Ok(Redirect::to(&format!("/?month={month}")))
}

/// Server-sent `change` events, one JSON `{date, checked}` per upsert.
pub async fn events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let subscription = state
        .store
        .subscribe()
        .ok_or_else(|| AppError::not_found("change feed is not available with the local backend"))?;

    let stream = subscription
        .into_stream()
        .map(|change| Event::default().event("change").json_data(change));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn resolve_month(query: &MonthQuery) -> Result<DisplayMonth, AppError> {
    match query.month.as_deref().map(str::trim) {
        None | Some("") => Ok(DisplayMonth::current()),
        Some(text) => Ok(text.parse()?),
    }
}

//! Request handlers for the record and thumbnail endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, OrFailure};
use super::AppState;
use crate::record::{Record, RecordInput};

const LOAD_FAILED: &str = "Failed to load data";
const SAVE_FAILED: &str = "Failed to save data";
const DELETE_FAILED: &str = "Failed to delete data";
const PREVIEW_FAILED: &str = "Failed to fetch preview image";

/// Body of a successful delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The removed record.
    pub deleted: Record,
}

/// Query of the thumbnail endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PreviewQuery {
    url: Option<String>,
}

/// Body of the thumbnail endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Preview image URL, if the page declares one.
    pub image_url: Option<String>,
}

pub(crate) async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let records = state.records.list().await.or_failure(LOAD_FAILED)?;
    Ok(Json(records))
}

pub(crate) async fn create_restaurant(
    State(state): State<AppState>,
    payload: Result<Json<RecordInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let Json(input) = payload?;
    let record = state.records.create(input).await.or_failure(SAVE_FAILED)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    let record = state.records.get(&id).await.or_failure(LOAD_FAILED)?;
    Ok(Json(record))
}

pub(crate) async fn update_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecordInput>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Json(input) = payload?;
    let record = state
        .records
        .update(&id, input)
        .await
        .or_failure(SAVE_FAILED)?;
    Ok(Json(record))
}

pub(crate) async fn delete_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.records.delete(&id).await.or_failure(DELETE_FAILED)?;
    Ok(Json(DeleteResponse {
        message: "Restaurant deleted".to_string(),
        deleted,
    }))
}

pub(crate) async fn preview_image(
    State(state): State<AppState>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let Query(query) = query?;
    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL parameter is required"))?;

    let image_url = state
        .thumbnails
        .resolve(&url)
        .await
        .or_failure(PREVIEW_FAILED)?;
    Ok(Json(PreviewResponse { image_url }))
}

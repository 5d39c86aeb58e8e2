use super::{FindQuery, FindResponse, ListResponse, StatusResponse, TimeSlot, codec};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

fn find_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(FindResponse {
            success: false,
            found: false,
            image: None,
            message: Some(message.into()),
        }),
    )
        .into_response()
}

pub async fn list_handler(State(app_state): State<AppState>) -> Response {
    match app_state.results.list().await {
        Ok(images) => Json(ListResponse {
            success: true,
            count: images.len(),
            images,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to list results: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListResponse {
                    success: false,
                    count: 0,
                    images: Vec::new(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn find_handler(
    State(app_state): State<AppState>,
    Query(query): Query<FindQuery>,
) -> Response {
    let (Some(date), Some(time)) = (query.date.as_deref(), query.time.as_deref()) else {
        return find_error(StatusCode::BAD_REQUEST, "Both date and time are required");
    };

    let Some(date) = codec::parse_date_fragment(date) else {
        warn!(date = %date, "Invalid date in find request");
        return find_error(StatusCode::BAD_REQUEST, "Date must be DD-MM-YYYY");
    };

    let slot: TimeSlot = match time.parse() {
        Ok(slot) => slot,
        Err(e) => {
            warn!(time = %time, "Invalid time in find request");
            return find_error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match app_state.results.find(date, slot).await {
        Ok(Some(image)) => Json(FindResponse {
            success: true,
            found: true,
            image: Some(image),
            message: None,
        })
        .into_response(),
        Ok(None) => Json(FindResponse {
            success: true,
            found: false,
            image: None,
            message: Some(format!(
                "No result for {} {}",
                codec::format_date(date),
                slot
            )),
        })
        .into_response(),
        Err(e) => {
            error!("Failed to look up result: {}", e);
            find_error(StatusCode::INTERNAL_SERVER_ERROR, "Index unavailable")
        }
    }
}

pub async fn clear_cache_handler(State(app_state): State<AppState>) -> Json<StatusResponse> {
    app_state.results.clear_cache().await;
    Json(StatusResponse {
        success: true,
        message: "Cache cleared".to_string(),
    })
}

pub async fn result_file_handler(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    if codec::parse_filename(&filename).is_none() || !app_state.results.is_image(&filename) {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    app_state.result_files.serve(&filename).await
}

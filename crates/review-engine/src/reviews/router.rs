use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, put},
    Router,
};
use serde_json::json;

use super::domain::{Actor, QuestionId, ReviewId};
use super::patch::{ReviewDraft, ReviewItemDraft, ReviewItemPatch, ReviewPatch};
use super::query::ReviewQuery;
use super::service::{ReviewService, ReviewServiceError};

/// Router builder exposing the review CRUD surface. Identity arrives from
/// the upstream gateway as verified headers; authentication itself is out of
/// scope here.
pub fn review_router(service: Arc<ReviewService>) -> Router {
    Router::new()
        .route(
            "/api/v1/reviews",
            get(list_handler).post(create_handler),
        )
        .route(
            "/api/v1/reviews/:review_id",
            get(get_handler)
                .patch(update_handler)
                .delete(delete_handler),
        )
        .route(
            "/api/v1/reviews/:review_id/items",
            put(replace_items_handler).post(create_item_handler),
        )
        .route(
            "/api/v1/reviews/:review_id/items/:question_id",
            patch(update_item_handler).delete(delete_item_handler),
        )
        .with_state(service)
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let header_flag = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };

    Actor {
        member_id: headers
            .get("x-member-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string()),
        is_machine: header_flag("x-is-machine"),
        is_admin: header_flag("x-is-admin"),
    }
}

fn error_response(error: ReviewServiceError) -> Response {
    match error {
        ReviewServiceError::NotFound(kind) => {
            let payload = json!({ "error": format!("{kind} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        ReviewServiceError::Validation(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        ReviewServiceError::Forbidden(reason) => {
            let payload = json!({
                "error": reason.to_string(),
                "code": reason.code(),
            });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        ReviewServiceError::Conflict => {
            let payload = json!({ "error": "review already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        ReviewServiceError::Internal(message) => {
            let payload = json!({ "error": message });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn create_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<ReviewDraft>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.create_review(&actor, draft) {
        Ok(review) => (StatusCode::CREATED, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Query(query): Query<ReviewQuery>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.list_reviews(&actor, &query) {
        Ok(reviews) => (StatusCode::OK, axum::Json(reviews)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.get_review(&actor, &ReviewId(review_id)) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    axum::Json(patch): axum::Json<ReviewPatch>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.update_review(&actor, &ReviewId(review_id), patch) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.delete_review(&actor, &ReviewId(review_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_item_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    axum::Json(draft): axum::Json<ReviewItemDraft>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.create_review_item(&actor, &ReviewId(review_id), draft) {
        Ok(review) => (StatusCode::CREATED, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn replace_items_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    axum::Json(drafts): axum::Json<Vec<ReviewItemDraft>>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.set_review_items(&actor, &ReviewId(review_id), drafts) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_item_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path((review_id, question_id)): Path<(String, String)>,
    axum::Json(patch): axum::Json<ReviewItemPatch>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.update_review_item(
        &actor,
        &ReviewId(review_id),
        &QuestionId(question_id),
        patch,
    ) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_item_handler(
    State(service): State<Arc<ReviewService>>,
    headers: HeaderMap,
    Path((review_id, question_id)): Path<(String, String)>,
) -> Response {
    let actor = actor_from_headers(&headers);
    match service.delete_review_item(&actor, &ReviewId(review_id), &QuestionId(question_id)) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => error_response(error),
    }
}

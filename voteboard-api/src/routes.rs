use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use voteboard_app::domain::{AuthenticatedUser, VoteDirection};
use voteboard_app::AppContext;
use voteboard_errors::AppError;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/votes/{direction}", post(cast_vote))
        .route(
            "/feature_requests",
            get(list_feature_requests).post(create_feature_request),
        )
        .route("/feature_requests/{id}", get(get_feature_request))
        .route("/comments", get(list_comments).post(create_comment))
        .route("/auth/validate", post(validate_token))
        .with_state(ctx)
}

/// Bearer-token guard shared by every mutating route. Completes before any
/// storage access.
async fn authenticate(ctx: &AppContext, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(headers)?;
    ctx.verifier.verify(token).await
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid authorization header".to_string())
        })
}

#[derive(Deserialize)]
struct VoteBody {
    feature_request_id: Option<i32>,
}

#[derive(Serialize)]
struct VoteResponse {
    success: bool,
    message: String,
    action: String,
}

async fn cast_vote(
    State(ctx): State<AppContext>,
    Path(direction): Path<VoteDirection>,
    headers: HeaderMap,
    Json(body): Json<VoteBody>,
) -> Result<Json<VoteResponse>, AppError> {
    let user = authenticate(&ctx, &headers).await?;
    let Some(feature_request_id) = body.feature_request_id else {
        return Err(AppError::Validation(
            "feature_request_id is required".to_string(),
        ));
    };

    let outcome = ctx
        .cast_vote
        .apply(&user, feature_request_id, direction)
        .await?;

    Ok(Json(VoteResponse {
        success: true,
        message: outcome.message(direction),
        action: outcome.action(direction),
    }))
}

#[derive(Deserialize)]
struct CreateFeatureRequestBody {
    title: Option<String>,
    subtitle: Option<String>,
}

async fn create_feature_request(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateFeatureRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&ctx, &headers).await?;

    let title = body.title.unwrap_or_default();
    let subtitle = body.subtitle.unwrap_or_default();
    if title.trim().is_empty() || subtitle.trim().is_empty() {
        return Err(AppError::Validation(
            "Title and subtitle are required".to_string(),
        ));
    }
    if title.chars().count() > 255 {
        return Err(AppError::Validation(
            "Title must not exceed 255 characters".to_string(),
        ));
    }
    if subtitle.chars().count() > 500 {
        return Err(AppError::Validation(
            "Subtitle must not exceed 500 characters".to_string(),
        ));
    }

    let created = ctx.feature_requests.create(&user, title, subtitle).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Feature request created successfully",
            "data": created,
        })),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_feature_requests(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(100).max(1);

    let (items, total) = ctx.feature_requests.list_page(page, limit).await?;

    Ok(Json(json!({
        "success": true,
        "data": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "total_pages": total.div_ceil(limit),
        },
    })))
}

async fn get_feature_request(
    State(ctx): State<AppContext>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let view = ctx
        .feature_requests
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({ "success": true, "data": view })))
}

#[derive(Deserialize)]
struct CreateCommentBody {
    feature_request_id: Option<i32>,
    comment: Option<String>,
}

async fn create_comment(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateCommentBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&ctx, &headers).await?;

    let Some(feature_request_id) = body.feature_request_id else {
        return Err(AppError::Validation(
            "feature_request_id is required".to_string(),
        ));
    };
    let text = body.comment.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }

    if !ctx.feature_requests.exists(feature_request_id).await? {
        return Err(AppError::NotFound);
    }

    let comment = ctx
        .comments
        .create(&user, feature_request_id, text.to_string())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment posted successfully",
            "data": comment,
        })),
    ))
}

#[derive(Deserialize)]
struct CommentsQuery {
    feature_request_id: Option<i32>,
}

async fn list_comments(
    State(ctx): State<AppContext>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(feature_request_id) = query.feature_request_id else {
        return Err(AppError::Validation(
            "feature_request_id query parameter is required".to_string(),
        ));
    };

    let comments = ctx.comments.list_for_feature_request(feature_request_id).await?;

    Ok(Json(json!({ "success": true, "data": comments })))
}

#[derive(Deserialize)]
struct ValidateBody {
    token: Option<String>,
}

async fn validate_token(
    State(ctx): State<AppContext>,
    Json(body): Json<ValidateBody>,
) -> Result<impl IntoResponse, AppError> {
    let Some(token) = body.token.filter(|token| !token.is_empty()) else {
        return Err(AppError::Validation("Token is required".to_string()));
    };

    match ctx.verifier.verify(&token).await {
        Ok(user) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "valid": true,
                "message": "Token is valid",
                "user": user,
            })),
        )),
        Err(AppError::Unauthorized(message)) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "valid": false,
                "message": message,
            })),
        )),
        Err(err) => Err(err),
    }
}

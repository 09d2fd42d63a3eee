//! Favourite API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{message, ApiResult, MessageResponse};
use crate::auth::RequestContext;
use crate::errors::AppError;
use crate::models::validation::check_asset_id;
use crate::models::{
    AddFavouriteRequest, Asset, AssetType, FavouriteRecord, UpdateDescriptionRequest,
};
use crate::AppState;

/// GET /api/v1/favourites - List the caller's favourites, newest first.
pub async fn list_favourites(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<FavouriteRecord>>> {
    let favourites = state.repo.list(&ctx.user_id).await?;

    tracing::info!(
        user_id = %ctx.user_id,
        request_id = %ctx.request_id,
        count = favourites.len(),
        "favourites retrieved"
    );
    Ok(Json(favourites))
}

/// POST /api/v1/favourites - Add a favourite.
pub async fn add_favourite(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<AddFavouriteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = body.map_err(|e| {
        tracing::warn!(user_id = %ctx.user_id, error = %e, "failed to decode request body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    let asset = parse_asset(&request)?;
    let asset_id = asset.id().to_string();
    let asset_type = asset.asset_type();

    match state
        .repo
        .create(&ctx.user_id, asset, &request.description)
        .await
    {
        Ok(_) => {
            tracing::info!(
                user_id = %ctx.user_id,
                request_id = %ctx.request_id,
                asset_id = %asset_id,
                asset_type = %asset_type,
                "favourite added"
            );
            Ok((
                StatusCode::CREATED,
                message("Favourite added successfully"),
            ))
        }
        Err(e) => {
            tracing::warn!(
                user_id = %ctx.user_id,
                request_id = %ctx.request_id,
                asset_id = %asset_id,
                error = %e,
                "add favourite rejected"
            );
            Err(e.into())
        }
    }
}

/// PATCH /api/v1/favourites/{asset_id} - Replace a favourite's description.
pub async fn update_favourite(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(asset_id): Path<String>,
    body: Result<Json<UpdateDescriptionRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    check_asset_id(&asset_id)?;
    let Json(request) = body.map_err(|e| {
        tracing::warn!(user_id = %ctx.user_id, asset_id = %asset_id, error = %e, "failed to decode request body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    if let Err(e) = state
        .repo
        .update(&ctx.user_id, &asset_id, &request.description)
        .await
    {
        tracing::warn!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            asset_id = %asset_id,
            error = %e,
            "update favourite rejected"
        );
        return Err(e.into());
    }

    tracing::info!(user_id = %ctx.user_id, request_id = %ctx.request_id, asset_id = %asset_id, "favourite updated");
    Ok(message("Description updated successfully"))
}

/// DELETE /api/v1/favourites/{asset_id} - Remove a favourite.
pub async fn remove_favourite(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(asset_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    check_asset_id(&asset_id)?;

    if let Err(e) = state.repo.delete(&ctx.user_id, &asset_id).await {
        tracing::warn!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            asset_id = %asset_id,
            error = %e,
            "remove favourite rejected"
        );
        return Err(e.into());
    }

    tracing::info!(user_id = %ctx.user_id, request_id = %ctx.request_id, asset_id = %asset_id, "favourite removed");
    Ok(message("Favourite removed successfully"))
}

fn parse_asset(request: &AddFavouriteRequest) -> Result<Asset, AppError> {
    let asset_type = AssetType::parse(&request.asset_type).ok_or_else(|| {
        AppError::BadRequest(format!("unknown asset type: {:?}", request.asset_type))
    })?;
    Asset::from_parts(asset_type, request.asset_data.clone())
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

//! The caller's own profile.

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
};
use serde::Deserialize;
use w101::auth::UserId;
use w101::profile::Profile;

use super::{
    AppState,
    error::{ApiResult, ok},
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<Profile> {
    Ok(ok(state.profiles.profile(user_id).await?))
}

/// Update editable fields; absent fields are left alone.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Profile> {
    let Json(request) = payload?;
    let profile = match request.display_name {
        Some(name) => state.profiles.update_display_name(user_id, &name).await?,
        None => state.profiles.profile(user_id).await?,
    };
    Ok(ok(profile))
}

use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::AuthUser;
use sohaeng_shared::types::ApiResponse;

use crate::models::{Match, Profile};
use crate::schema::{matches, profiles};
use crate::services::profile_view::ProfileView;
use crate::AppState;

/// GET /matches - the caller's matches, newest first.
pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Match>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows = matches::table
        .filter(matches::user_a.eq(user.id).or(matches::user_b.eq(user.id)))
        .order(matches::created_at.desc())
        .load::<Match>(&mut conn)?;

    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Serialize)]
pub struct MatchDetail {
    #[serde(rename = "match")]
    pub match_info: Match,
    pub other_profile: ProfileView,
}

/// GET /matches/:id - one match with the counterpart's disclosed profile.
pub async fn get_match_detail(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchDetail>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let record = matches::table
        .find(match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    let other_id = record
        .other_user(user.id)
        .ok_or_else(|| AppError::new(ErrorCode::NotMatchParticipant, "access denied"))?;

    let other_profile = profiles::table
        .find(other_id)
        .first::<Profile>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "other user profile not found"))?;

    Ok(Json(ApiResponse::ok(MatchDetail {
        match_info: record,
        other_profile: ProfileView::disclosed(&other_profile),
    })))
}

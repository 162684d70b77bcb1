use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::AuthUser;
use sohaeng_shared::types::ApiResponse;

use crate::models::{Like, Match, NewLike, NewMatch, User};
use crate::schema::{likes, matches, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub to_user_id: Uuid,
    pub batch_week: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub ok: bool,
}

/// POST /likes - record a like for this batch week. Idempotent per
/// (sender, target, week); a mutual like creates a pending match.
pub async fn send_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<ApiResponse<LikeResponse>>> {
    if req.to_user_id == user.id {
        return Err(AppError::new(ErrorCode::CannotLikeSelf, "cannot like yourself"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let target = users::table
        .find(req.to_user_id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::TargetUserNotFound, "target user not found"))?;

    if target.banned {
        return Err(AppError::new(ErrorCode::TargetUserBanned, "cannot like a banned user"));
    }

    let existing = likes::table
        .filter(likes::from_user.eq(user.id))
        .filter(likes::to_user.eq(req.to_user_id))
        .filter(likes::batch_week.eq(&req.batch_week))
        .first::<Like>(&mut conn)
        .optional()?;
    if existing.is_some() {
        return Ok(Json(ApiResponse::ok(LikeResponse { ok: true })));
    }

    let new_like = NewLike {
        from_user: user.id,
        to_user: req.to_user_id,
        batch_week: req.batch_week.clone(),
    };
    match diesel::insert_into(likes::table).values(&new_like).execute(&mut conn) {
        Ok(_) => {}
        // Lost the race to an identical like; nothing left to do.
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Ok(Json(ApiResponse::ok(LikeResponse { ok: true })));
        }
        Err(e) => return Err(e.into()),
    }

    let reciprocal = likes::table
        .filter(likes::from_user.eq(req.to_user_id))
        .filter(likes::to_user.eq(user.id))
        .filter(likes::batch_week.eq(&req.batch_week))
        .first::<Like>(&mut conn)
        .optional()?;

    if reciprocal.is_some() {
        let existing_match = matches::table
            .filter(
                matches::user_a
                    .eq(user.id)
                    .and(matches::user_b.eq(req.to_user_id))
                    .or(matches::user_a
                        .eq(req.to_user_id)
                        .and(matches::user_b.eq(user.id))),
            )
            .first::<Match>(&mut conn)
            .optional()?;

        if existing_match.is_none() {
            let new_match = NewMatch::pending(user.id, req.to_user_id);
            diesel::insert_into(matches::table)
                .values(&new_match)
                .execute(&mut conn)?;

            tracing::info!(
                user_a = %new_match.user_a,
                user_b = %new_match.user_b,
                week = %req.batch_week,
                "mutual like created match"
            );
        }
    }

    Ok(Json(ApiResponse::ok(LikeResponse { ok: true })))
}

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::{AuthUser, Claims, UserRole};
use sohaeng_shared::types::ApiResponse;

use crate::models::{
    default_visibility, NewPreferences, NewProfile, NewUser, Preferences, Profile, User,
};
use crate::schema::{preferences, profiles, users};
use crate::AppState;

const DEFAULT_NICKNAME: &str = "사용자";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncKakaoRequest {
    pub kakao_user_id: String,
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user: User,
}

/// POST /auth/sync-kakao - upsert the user for a Kakao identity and hand
/// back a session token. First sync also seeds a default profile and
/// preferences so the account is immediately editable.
pub async fn sync_kakao(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncKakaoRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing = users::table
        .filter(users::kakao_user_id.eq(&req.kakao_user_id))
        .first::<User>(&mut conn)
        .optional()?;

    let user = match existing {
        Some(user) => user,
        None => {
            let new_user = NewUser {
                id: Uuid::new_v4(),
                kakao_user_id: req.kakao_user_id.clone(),
            };
            let user: User = diesel::insert_into(users::table)
                .values(&new_user)
                .get_result(&mut conn)?;

            let nickname = req
                .nickname
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_NICKNAME.to_string());
            let profile = NewProfile {
                user_id: user.id,
                nickname,
                gender: "M".into(),
                birth_year: 1990,
                height: None,
                region: None,
                job: None,
                intro: None,
                photos: serde_json::json!([]),
                visible: default_visibility(),
            };
            diesel::insert_into(profiles::table)
                .values(&profile)
                .execute(&mut conn)?;

            let prefs = NewPreferences {
                user_id: user.id,
                target_gender: "F".into(),
                age_min: 20,
                age_max: 40,
                regions: vec![],
                keywords: vec![],
                blocks: vec![],
            };
            diesel::insert_into(preferences::table)
                .values(&prefs)
                .execute(&mut conn)?;

            tracing::info!(user_id = %user.id, "user created from kakao sync");
            user
        }
    };

    let role = user.role.parse::<UserRole>().unwrap_or(UserRole::User);
    let claims = Claims::new(user.id, role, state.config.jwt_expire_minutes * 60);
    let jwt = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.app_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))?;

    Ok(Json(ApiResponse::ok(AuthResponse { jwt, user })))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub profile: Option<Profile>,
    pub preferences: Option<Preferences>,
}

/// GET /auth/me - current user with profile and preferences.
pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let db_user = users::table
        .find(user.id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    let profile = profiles::table
        .find(user.id)
        .first::<Profile>(&mut conn)
        .optional()?;
    let prefs = preferences::table
        .find(user.id)
        .first::<Preferences>(&mut conn)
        .optional()?;

    Ok(Json(ApiResponse::ok(MeResponse {
        user: db_user,
        profile,
        preferences: prefs,
    })))
}

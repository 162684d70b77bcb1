use axum::extract::State;
use axum::Json;
use chrono::{Datelike, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::AuthUser;
use sohaeng_shared::types::ApiResponse;

use crate::models::{NewPreferences, NewProfile, Preferences, Profile};
use crate::schema::{preferences, profiles};
use crate::AppState;

const MIN_BIRTH_YEAR: i32 = 1950;
const MIN_MEMBER_AGE: i32 = 18;

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 50, message = "nickname must be 1-50 characters"))]
    pub nickname: String,
    pub gender: String,
    pub birth_year: i32,
    pub height: Option<i32>,
    pub region: Option<String>,
    pub job: Option<String>,
    #[validate(length(max = 2000, message = "intro is too long"))]
    pub intro: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub visible: Option<HashMap<String, bool>>,
}

/// PUT /profile - full profile replace; creates the row on first write.
pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileUpdateRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if req.gender != "M" && req.gender != "F" {
        return Err(AppError::new(ErrorCode::InvalidGender, "gender must be 'M' or 'F'"));
    }

    let current_year = Utc::now().year();
    if req.birth_year < MIN_BIRTH_YEAR || req.birth_year > current_year - MIN_MEMBER_AGE {
        return Err(AppError::new(ErrorCode::InvalidBirthYear, "invalid birth year"));
    }

    let visible = match req.visible {
        Some(map) => serde_json::to_value(map)
            .map_err(|e| AppError::internal(format!("visibility map encoding failed: {e}")))?,
        None => crate::models::default_visibility(),
    };

    let changes = NewProfile {
        user_id: user.id,
        nickname: req.nickname,
        gender: req.gender,
        birth_year: req.birth_year,
        height: req.height,
        region: req.region,
        job: req.job,
        intro: req.intro,
        photos: serde_json::json!(req.photos),
        visible,
    };

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = diesel::insert_into(profiles::table)
        .values(&changes)
        .on_conflict(profiles::user_id)
        .do_update()
        .set(&changes)
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(profile)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreferencesUpdateRequest {
    pub target_gender: String,
    #[validate(range(min = 18, max = 80, message = "age range must be between 18 and 80"))]
    pub age_min: i32,
    #[validate(range(min = 18, max = 80, message = "age range must be between 18 and 80"))]
    pub age_max: i32,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<Uuid>,
}

/// PUT /preferences - full preferences replace; creates the row on first
/// write.
pub async fn update_preferences(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreferencesUpdateRequest>,
) -> AppResult<Json<ApiResponse<Preferences>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if req.target_gender != "M" && req.target_gender != "F" {
        return Err(AppError::new(ErrorCode::InvalidGender, "target gender must be 'M' or 'F'"));
    }

    if req.age_min > req.age_max {
        return Err(AppError::new(
            ErrorCode::InvalidAgeRange,
            "minimum age cannot be greater than maximum age",
        ));
    }

    let changes = NewPreferences {
        user_id: user.id,
        target_gender: req.target_gender,
        age_min: req.age_min,
        age_max: req.age_max,
        regions: req.regions,
        keywords: req.keywords,
        blocks: req.blocks,
    };

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let prefs: Preferences = diesel::insert_into(preferences::table)
        .values(&changes)
        .on_conflict(preferences::user_id)
        .do_update()
        .set(&changes)
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(prefs)))
}

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::AuthUser;
use sohaeng_shared::types::ApiResponse;

use crate::models::{Profile, Recommendation};
use crate::recs;
use crate::schema::{profiles, recommendations};
use crate::services::profile_view::ProfileView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecsQuery {
    pub week: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub id: i64,
    pub target_user_id: Uuid,
    pub batch_week: String,
    pub score: f64,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded: bool,
    pub target_profile: ProfileView,
}

/// GET /recommendations?week=YYYY-Www - the caller's recommendations for
/// one batch week, best score first, target profiles filtered by their
/// owners' disclosure maps.
pub async fn list_recommendations(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecsQuery>,
) -> AppResult<Json<ApiResponse<Vec<RecommendationItem>>>> {
    if !recs::is_valid_week_label(&params.week) {
        return Err(AppError::new(
            ErrorCode::InvalidWeekLabel,
            "week must use the YYYY-Www format (e.g. 2025-W03)",
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows = recommendations::table
        .filter(recommendations::user_id.eq(user.id))
        .filter(recommendations::batch_week.eq(&params.week))
        .order(recommendations::score.desc())
        .load::<Recommendation>(&mut conn)?;

    let target_ids: Vec<Uuid> = rows.iter().map(|r| r.target_user_id).collect();
    let target_profiles: HashMap<Uuid, Profile> = profiles::table
        .filter(profiles::user_id.eq_any(&target_ids))
        .load::<Profile>(&mut conn)?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    // Targets whose profile disappeared since the batch ran are dropped
    // from the listing rather than served half-empty.
    let items = rows
        .into_iter()
        .filter_map(|rec| {
            target_profiles.get(&rec.target_user_id).map(|profile| RecommendationItem {
                id: rec.id,
                target_user_id: rec.target_user_id,
                batch_week: rec.batch_week,
                score: rec.score,
                sent_at: rec.sent_at,
                responded: rec.responded,
                target_profile: ProfileView::disclosed(profile),
            })
        })
        .collect();

    Ok(Json(ApiResponse::ok(items)))
}

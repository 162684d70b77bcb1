use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{
    admin_actions, exposure_log, likes, matches, payments, preferences, profiles, recommendations,
    users,
};

/// Disclosure map stamped onto freshly created profiles.
pub fn default_visibility() -> serde_json::Value {
    serde_json::json!({
        "age": true,
        "height": false,
        "region": true,
        "job": true,
        "intro": true
    })
}

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub kakao_user_id: String,
    pub phone_verified: bool,
    pub role: String,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub kakao_user_id: String,
}

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles, primary_key(user_id))]
pub struct Profile {
    pub user_id: Uuid,
    pub nickname: String,
    pub gender: String,
    pub birth_year: i32,
    pub height: Option<i32>,
    pub region: Option<String>,
    pub job: Option<String>,
    pub intro: Option<String>,
    pub photos: serde_json::Value,
    pub visible: serde_json::Value,
}

impl Profile {
    /// Number of photo references stored in the photos JSON list.
    pub fn photo_count(&self) -> usize {
        self.photos.as_array().map(|p| p.len()).unwrap_or(0)
    }

    /// Disclosure flag for a profile field. Absent keys count as visible.
    pub fn is_visible(&self, field: &str) -> bool {
        self.visible
            .get(field)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub nickname: String,
    pub gender: String,
    pub birth_year: i32,
    pub height: Option<i32>,
    pub region: Option<String>,
    pub job: Option<String>,
    pub intro: Option<String>,
    pub photos: serde_json::Value,
    pub visible: serde_json::Value,
}

// --- Preferences ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = preferences, primary_key(user_id))]
pub struct Preferences {
    pub user_id: Uuid,
    pub target_gender: String,
    pub age_min: i32,
    pub age_max: i32,
    pub regions: Vec<String>,
    pub keywords: Vec<String>,
    pub blocks: Vec<Uuid>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = preferences)]
pub struct NewPreferences {
    pub user_id: Uuid,
    pub target_gender: String,
    pub age_min: i32,
    pub age_max: i32,
    pub regions: Vec<String>,
    pub keywords: Vec<String>,
    pub blocks: Vec<Uuid>,
}

// --- Like ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: i64,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub batch_week: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub batch_week: String,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    pub fn other_user(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a == user_id {
            Some(self.user_b)
        } else if self.user_b == user_id {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub status: String,
}

impl NewMatch {
    /// Pair order is normalized so the same two users always map to the
    /// same (user_a, user_b) row regardless of who liked last.
    pub fn pending(first: Uuid, second: Uuid) -> Self {
        let (user_a, user_b) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        Self {
            id: Uuid::new_v4(),
            user_a,
            user_b,
            status: "pending".to_string(),
        }
    }
}

// --- Payment ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = payments)]
pub struct Payment {
    pub id: Uuid,
    pub match_id: Uuid,
    pub method: String,
    pub amount: i32,
    pub code: String,
    pub depositor_name: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub memo: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: Uuid,
    pub match_id: Uuid,
    pub method: String,
    pub amount: i32,
    pub code: String,
}

// --- Recommendation ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = recommendations)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    pub batch_week: String,
    pub score: f64,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = recommendations)]
pub struct NewRecommendation {
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    pub batch_week: String,
    pub score: f64,
    pub sent_at: DateTime<Utc>,
}

// --- ExposureLog ---
// Exposure facts are write-mostly; reads go through a target-id projection
// in the recommendation store, so there is no full read model here.

#[derive(Debug, Insertable)]
#[diesel(table_name = exposure_log)]
pub struct NewExposureLog {
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    pub reason: String,
}

// --- AdminAction ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = admin_actions)]
pub struct AdminAction {
    pub id: i64,
    pub admin_id: Uuid,
    pub action: String,
    pub target_id: Option<String>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_actions)]
pub struct NewAdminAction {
    pub admin_id: Uuid,
    pub action: String,
    pub target_id: Option<String>,
    pub detail: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(photos: serde_json::Value, visible: serde_json::Value) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            nickname: "tester".into(),
            gender: "M".into(),
            birth_year: 1990,
            height: None,
            region: None,
            job: None,
            intro: None,
            photos,
            visible,
        }
    }

    #[test]
    fn photo_count_handles_non_array_json() {
        let p = profile_with(serde_json::json!(["a.jpg", "b.jpg"]), serde_json::json!({}));
        assert_eq!(p.photo_count(), 2);

        let p = profile_with(serde_json::json!(null), serde_json::json!({}));
        assert_eq!(p.photo_count(), 0);
    }

    #[test]
    fn visibility_defaults_to_visible() {
        let p = profile_with(
            serde_json::json!([]),
            serde_json::json!({"age": true, "height": false}),
        );
        assert!(p.is_visible("age"));
        assert!(!p.is_visible("height"));
        // Key missing from the map
        assert!(p.is_visible("region"));
    }

    #[test]
    fn match_pair_order_is_normalized() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let m1 = NewMatch::pending(a, b);
        let m2 = NewMatch::pending(b, a);
        assert_eq!((m1.user_a, m1.user_b), (m2.user_a, m2.user_b));
        assert!(m1.user_a < m1.user_b);
        assert_eq!(m1.status, "pending");
    }
}

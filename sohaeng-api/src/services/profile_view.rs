use serde::Serialize;
use uuid::Uuid;

use crate::models::Profile;

/// Profile shaped for disclosure to another user. Fields the owner marked
/// hidden come through as null; photos are always shown to recommendation
/// and match counterparts.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub nickname: String,
    pub gender: String,
    pub birth_year: Option<i32>,
    pub height: Option<i32>,
    pub region: Option<String>,
    pub job: Option<String>,
    pub intro: Option<String>,
    pub photos: serde_json::Value,
    pub visible: serde_json::Value,
}

impl ProfileView {
    pub fn disclosed(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id,
            nickname: profile.nickname.clone(),
            gender: profile.gender.clone(),
            birth_year: profile.is_visible("age").then_some(profile.birth_year),
            height: if profile.is_visible("height") { profile.height } else { None },
            region: if profile.is_visible("region") { profile.region.clone() } else { None },
            job: if profile.is_visible("job") { profile.job.clone() } else { None },
            intro: if profile.is_visible("intro") { profile.intro.clone() } else { None },
            photos: profile.photos.clone(),
            visible: profile.visible.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(visible: serde_json::Value) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            nickname: "민지".into(),
            gender: "F".into(),
            birth_year: 1992,
            height: Some(165),
            region: Some("Seoul".into()),
            job: Some("designer".into()),
            intro: Some("안녕하세요".into()),
            photos: serde_json::json!(["a.jpg"]),
            visible,
        }
    }

    #[test]
    fn hidden_fields_are_nulled() {
        let p = profile(serde_json::json!({
            "age": false, "height": false, "region": true, "job": false, "intro": true
        }));
        let view = ProfileView::disclosed(&p);

        assert_eq!(view.birth_year, None);
        assert_eq!(view.height, None);
        assert_eq!(view.region.as_deref(), Some("Seoul"));
        assert_eq!(view.job, None);
        assert_eq!(view.intro.as_deref(), Some("안녕하세요"));
        // Photos ignore the visibility map.
        assert_eq!(view.photos, serde_json::json!(["a.jpg"]));
    }

    #[test]
    fn missing_visibility_keys_disclose() {
        let p = profile(serde_json::json!({}));
        let view = ProfileView::disclosed(&p);

        assert_eq!(view.birth_year, Some(1992));
        assert_eq!(view.height, Some(165));
        assert_eq!(view.job.as_deref(), Some("designer"));
    }
}

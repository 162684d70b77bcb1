use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use sohaeng_shared::clients::db::DbPool;

use crate::models::{NewExposureLog, NewRecommendation, Preferences, Profile, User};
use crate::schema::{exposure_log, preferences, profiles, recommendations, users};

/// A user together with the profile and preference rows the engine reads.
///
/// Both sides are optional: the batch population query joins them in, but
/// the engine defends against rows that lost one of them mid-run.
#[derive(Debug, Clone)]
pub struct Member {
    pub user: User,
    pub profile: Option<Profile>,
    pub preferences: Option<Preferences>,
}

/// Outcome of a recommendation insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// A row for this (user, target, week) already exists.
    Duplicate,
}

/// Storage operations the recommendation engine depends on.
pub trait RecStore {
    /// Users eligible for a batch run: not banned, not admin, with both
    /// profile and preferences present.
    fn load_population(&self) -> anyhow::Result<Vec<Member>>;

    /// Distinct target ids shown to `user_id` since `since`.
    fn recent_exposures(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashSet<Uuid>>;

    /// Append one exposure fact. Duplicates are allowed.
    fn record_exposure(&self, user_id: Uuid, target_id: Uuid, reason: &str) -> anyhow::Result<()>;

    /// Insert a recommendation row. A uniqueness conflict on
    /// (user, target, week) is reported as `Duplicate`, not as an error.
    fn insert_recommendation(&self, rec: &NewRecommendation) -> anyhow::Result<InsertOutcome>;
}

pub struct PgRecStore {
    pool: DbPool,
}

impl PgRecStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RecStore for PgRecStore {
    fn load_population(&self) -> anyhow::Result<Vec<Member>> {
        let mut conn = self.pool.get()?;

        let rows = users::table
            .inner_join(profiles::table)
            .inner_join(preferences::table)
            .filter(users::banned.eq(false))
            .filter(users::role.ne("admin"))
            .load::<(User, Profile, Preferences)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(user, profile, prefs)| Member {
                user,
                profile: Some(profile),
                preferences: Some(prefs),
            })
            .collect())
    }

    fn recent_exposures(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashSet<Uuid>> {
        let mut conn = self.pool.get()?;

        let targets = exposure_log::table
            .filter(exposure_log::user_id.eq(user_id))
            .filter(exposure_log::seen_at.ge(since))
            .select(exposure_log::target_user_id)
            .load::<Uuid>(&mut conn)?;

        Ok(targets.into_iter().collect())
    }

    fn record_exposure(&self, user_id: Uuid, target_id: Uuid, reason: &str) -> anyhow::Result<()> {
        let mut conn = self.pool.get()?;

        let entry = NewExposureLog {
            user_id,
            target_user_id: target_id,
            reason: reason.to_string(),
        };
        diesel::insert_into(exposure_log::table)
            .values(&entry)
            .execute(&mut conn)?;
        Ok(())
    }

    fn insert_recommendation(&self, rec: &NewRecommendation) -> anyhow::Result<InsertOutcome> {
        let mut conn = self.pool.get()?;

        match diesel::insert_into(recommendations::table)
            .values(rec)
            .execute(&mut conn)
        {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }
}

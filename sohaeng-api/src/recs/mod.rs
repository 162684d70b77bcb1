//! Weekly recommendation engine.
//!
//! Once per batch week, every eligible user gets a bounded, ranked set of
//! compatible candidates. Candidates shown within the trailing exposure
//! window are excluded, survivors are scored and ranked, and the winners
//! are persisted as recommendation rows plus exposure facts. The storage
//! uniqueness constraint on (user, target, week) is the sole arbiter of
//! "already recommended".

mod builder;
mod filter;
mod runner;
mod score;
mod store;

pub use builder::{build_for_user, EXPOSURE_WINDOW_WEEKS, MAX_RECOMMENDATIONS};
pub use filter::{find_candidates, mutually_compatible};
pub use runner::{is_valid_week_label, run, week_label_for, RunError, RunSummary};
pub use score::match_score;
pub use store::{InsertOutcome, Member, PgRecStore, RecStore};

use chrono::Utc;
use sohaeng_shared::clients::db::DbPool;

/// Entry point used by the scheduler and the admin re-run endpoint.
/// Blocking; callers on the runtime wrap it in `spawn_blocking`.
pub fn build_weekly_recommendations(pool: DbPool, week_label: &str) -> RunSummary {
    let store = PgRecStore::new(pool);
    run(&store, week_label, Utc::now())
}

use chrono::{DateTime, Duration, Utc};

use crate::models::NewRecommendation;

use super::filter;
use super::score;
use super::store::{InsertOutcome, Member, RecStore};

/// Exposure facts younger than this suppress re-recommending a pair.
pub const EXPOSURE_WINDOW_WEEKS: i64 = 12;
/// Recommendations created per user per week.
pub const MAX_RECOMMENDATIONS: usize = 10;

const REASON_WEEKLY_REC: &str = "weekly_rec";

/// Builds this week's recommendations for one user and returns how many
/// were created. Candidates seen within the exposure window are skipped,
/// the rest are scored and ranked, and the top `max_count` are persisted
/// together with an exposure fact each. A uniqueness conflict means the
/// pair was already recommended this week and is skipped silently; any
/// other per-candidate persistence failure is logged and does not stop the
/// remaining candidates.
pub fn build_for_user<S: RecStore>(
    store: &S,
    member: &Member,
    batch_week: &str,
    max_count: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let since = now - Duration::weeks(EXPOSURE_WINDOW_WEEKS);
    let recent = store.recent_exposures(member.user.id, since)?;

    let candidates: Vec<Member> = filter::find_candidates(store, member, now.date_naive())?
        .into_iter()
        .filter(|candidate| !recent.contains(&candidate.user.id))
        .collect();

    if candidates.is_empty() {
        tracing::info!(user_id = %member.user.id, week = batch_week, "no new candidates");
        return Ok(0);
    }

    let mut scored: Vec<(Member, f64)> = candidates
        .into_iter()
        .map(|candidate| {
            let pair_score = score::match_score(member, &candidate);
            (candidate, pair_score)
        })
        .collect();

    // Highest score first; equal scores fall back to candidate id so the
    // ranking does not depend on storage enumeration order.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.user.id.cmp(&b.0.user.id))
    });
    scored.truncate(max_count);

    let mut created = 0;
    for (candidate, pair_score) in &scored {
        let rec = NewRecommendation {
            user_id: member.user.id,
            target_user_id: candidate.user.id,
            batch_week: batch_week.to_string(),
            score: *pair_score,
            sent_at: now,
        };

        match store.insert_recommendation(&rec) {
            Ok(InsertOutcome::Created) => {
                match store.record_exposure(member.user.id, candidate.user.id, REASON_WEEKLY_REC) {
                    Ok(()) => created += 1,
                    Err(e) => tracing::error!(
                        user_id = %member.user.id,
                        target_id = %candidate.user.id,
                        error = %e,
                        "recommendation stored but exposure append failed"
                    ),
                }
            }
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!(
                    user_id = %member.user.id,
                    target_id = %candidate.user.id,
                    week = batch_week,
                    "already recommended this week"
                );
            }
            Err(e) => tracing::error!(
                user_id = %member.user.id,
                target_id = %candidate.user.id,
                error = %e,
                "failed to create recommendation"
            ),
        }
    }

    tracing::info!(
        user_id = %member.user.id,
        week = batch_week,
        created,
        "recommendations created for user"
    );

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recs::store::testing::{member, MemStore};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap()
    }

    fn seeker_and_candidates(n: usize) -> (Member, Vec<Member>) {
        let seeker = member("M", 1990, "F", (20, 50));
        let candidates = (0..n)
            .map(|i| member("F", 1988 + i as i32 % 8, "M", (20, 50)))
            .collect();
        (seeker, candidates)
    }

    #[test]
    fn created_count_never_exceeds_max() {
        let (seeker, candidates) = seeker_and_candidates(15);
        let mut members = vec![seeker.clone()];
        members.extend(candidates);
        let store = MemStore::new(now()).with_members(members);

        let created = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        assert_eq!(created, 10);
        assert_eq!(store.created_for(seeker.user.id).len(), 10);

        // Every created recommendation also left an exposure fact.
        assert_eq!(store.exposures.lock().unwrap().len(), 10);
    }

    #[test]
    fn recently_exposed_candidates_are_skipped() {
        let (seeker, candidates) = seeker_and_candidates(3);
        let shown = candidates[0].user.id;
        let mut members = vec![seeker.clone()];
        members.extend(candidates);
        let store = MemStore::new(now()).with_members(members);
        store.seed_exposure(seeker.user.id, shown, now() - Duration::weeks(4));

        let created = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        assert_eq!(created, 2);
        assert!(store
            .created_for(seeker.user.id)
            .iter()
            .all(|r| r.target_user_id != shown));
    }

    #[test]
    fn exposures_older_than_the_window_do_not_suppress() {
        let (seeker, candidates) = seeker_and_candidates(1);
        let shown = candidates[0].user.id;
        let mut members = vec![seeker.clone()];
        members.extend(candidates);
        let store = MemStore::new(now()).with_members(members);
        store.seed_exposure(seeker.user.id, shown, now() - Duration::weeks(13));

        let created = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        assert_eq!(created, 1);
    }

    #[test]
    fn duplicate_rows_are_skipped_without_error() {
        let (seeker, candidates) = seeker_and_candidates(2);
        let already = candidates[0].user.id;
        let mut members = vec![seeker.clone()];
        members.extend(candidates);
        let store = MemStore::new(now()).with_members(members);
        store.seed_recommendation(NewRecommendation {
            user_id: seeker.user.id,
            target_user_id: already,
            batch_week: "2025-W10".into(),
            score: 4.0,
            sent_at: now(),
        });

        let created = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        assert_eq!(created, 1);
        // The pre-existing row was not duplicated.
        let rows = store.created_for(seeker.user.id);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows.iter().filter(|r| r.target_user_id == already).count(),
            1
        );
    }

    #[test]
    fn running_twice_creates_nothing_new() {
        let (seeker, candidates) = seeker_and_candidates(5);
        let mut members = vec![seeker.clone()];
        members.extend(candidates);
        let store = MemStore::new(now()).with_members(members);

        let first = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        let second = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();

        assert_eq!(first, 5);
        assert_eq!(second, 0);
        assert_eq!(store.created_for(seeker.user.id).len(), 5);
    }

    #[test]
    fn equal_scores_rank_by_candidate_id() {
        let seeker = member("M", 1990, "F", (20, 50));
        // Identical scoring inputs, so ids decide the order.
        let a = member("F", 1990, "M", (20, 50));
        let b = member("F", 1990, "M", (20, 50));
        let mut expected: Vec<Uuid> = vec![a.user.id, b.user.id];
        expected.sort();

        let store = MemStore::new(now()).with_members(vec![seeker.clone(), b, a]);
        build_for_user(&store, &seeker, "2025-W10", 1, now()).unwrap();

        let rows = store.created_for(seeker.user.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target_user_id, expected[0]);
    }

    #[test]
    fn no_candidates_is_not_an_error() {
        let seeker = member("M", 1990, "F", (20, 50));
        let store = MemStore::new(now()).with_members(vec![seeker.clone()]);

        let created = build_for_user(&store, &seeker, "2025-W10", 10, now()).unwrap();
        assert_eq!(created, 0);
        assert!(store.exposures.lock().unwrap().is_empty());
    }
}

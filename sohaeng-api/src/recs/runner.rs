use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::builder::{self, MAX_RECOMMENDATIONS};
use super::store::RecStore;

/// Result of one batch run, consumed by the admin audit log.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub week: String,
    pub users_processed: u32,
    pub recommendations_created: u32,
    pub errors: Vec<RunError>,
}

#[derive(Debug, Serialize)]
pub struct RunError {
    /// Absent for failures not attributable to a single user, such as the
    /// population query itself failing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub error: String,
}

/// Runs the weekly batch over every eligible user. One user's failure is
/// recorded and the run moves on; only a failing population query ends the
/// run early, and even then the partial summary is returned rather than an
/// error.
pub fn run<S: RecStore>(store: &S, week_label: &str, now: DateTime<Utc>) -> RunSummary {
    let mut summary = RunSummary {
        week: week_label.to_string(),
        users_processed: 0,
        recommendations_created: 0,
        errors: Vec::new(),
    };

    let population = match store.load_population() {
        Ok(population) => population,
        Err(e) => {
            tracing::error!(error = %e, week = week_label, "failed to load batch population");
            summary.errors.push(RunError {
                user_id: None,
                error: e.to_string(),
            });
            return summary;
        }
    };

    tracing::info!(week = week_label, users = population.len(), "building weekly recommendations");

    for member in &population {
        match builder::build_for_user(store, member, week_label, MAX_RECOMMENDATIONS, now) {
            Ok(created) => {
                summary.users_processed += 1;
                summary.recommendations_created += created as u32;
            }
            Err(e) => {
                tracing::error!(
                    user_id = %member.user.id,
                    error = %e,
                    "failed to build recommendations for user"
                );
                summary.errors.push(RunError {
                    user_id: Some(member.user.id),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        week = week_label,
        users_processed = summary.users_processed,
        recommendations_created = summary.recommendations_created,
        errors = summary.errors.len(),
        "completed recommendation generation"
    );

    summary
}

/// ISO year-week label for a date, e.g. `2025-W03`.
pub fn week_label_for(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// Week labels look like `YYYY-Www` with a zero-padded ISO week number.
pub fn is_valid_week_label(label: &str) -> bool {
    let Some((year, week)) = label.split_once("-W") else {
        return false;
    };
    year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && week.len() == 2
        && matches!(week.parse::<u32>(), Ok(1..=53))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recs::store::testing::{member, MemStore};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap()
    }

    #[test]
    fn one_failing_user_does_not_abort_the_run() {
        let user1 = member("M", 1990, "F", (20, 50));
        let user2 = member("M", 1991, "F", (20, 50));
        let user3 = member("M", 1992, "F", (20, 50));
        let candidate = member("F", 1990, "M", (20, 50));

        let mut store = MemStore::new(now()).with_members(vec![
            user1.clone(),
            user2.clone(),
            user3.clone(),
            candidate.clone(),
        ]);
        store.exposure_read_error_for = Some(user2.user.id);

        let summary = run(&store, "2025-W10", now());

        // The failing user is skipped; everyone else is processed. The
        // candidate herself processes cleanly too (users 1-3 match her
        // preferences both ways).
        assert_eq!(summary.users_processed, 3);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].user_id, Some(user2.user.id));

        assert_eq!(store.created_for(user1.user.id).len(), 1);
        assert!(store.created_for(user2.user.id).is_empty());
        assert_eq!(store.created_for(user3.user.id).len(), 1);
    }

    #[test]
    fn population_failure_yields_general_error_summary() {
        let mut store = MemStore::new(now());
        store.population_error = true;

        let summary = run(&store, "2025-W10", now());

        assert_eq!(summary.users_processed, 0);
        assert_eq!(summary.recommendations_created, 0);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].user_id, None);
    }

    #[test]
    fn summary_totals_add_up() {
        let user1 = member("M", 1990, "F", (20, 50));
        let user2 = member("F", 1991, "M", (20, 50));
        let store = MemStore::new(now()).with_members(vec![user1.clone(), user2.clone()]);

        let summary = run(&store, "2025-W10", now());

        assert_eq!(summary.week, "2025-W10");
        assert_eq!(summary.users_processed, 2);
        assert_eq!(summary.recommendations_created, 2);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn week_labels_use_iso_week_numbering() {
        let label = |y, m, d| week_label_for(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(label(2025, 1, 13), "2025-W03");
        assert_eq!(label(2024, 9, 12), "2024-W37");
        // ISO week years shift at the calendar year boundary.
        assert_eq!(label(2024, 12, 31), "2025-W01");
        assert_eq!(label(2021, 1, 1), "2020-W53");
    }

    #[test]
    fn week_label_validation() {
        assert!(is_valid_week_label("2025-W03"));
        assert!(is_valid_week_label("2024-W53"));
        assert!(!is_valid_week_label("2025-W00"));
        assert!(!is_valid_week_label("2025-W54"));
        assert!(!is_valid_week_label("2025-3"));
        assert!(!is_valid_week_label("2025W03"));
        assert!(!is_valid_week_label("25-W03"));
        assert!(!is_valid_week_label(""));
    }
}

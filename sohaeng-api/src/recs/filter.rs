use chrono::{Datelike, NaiveDate};

use super::store::{Member, RecStore};

/// Candidates compatible with `member` under the mutual preference
/// predicate. Returns an empty list when the member has no profile or no
/// preferences. No ordering guarantee; ranking happens at scoring time.
pub fn find_candidates<S: RecStore>(
    store: &S,
    member: &Member,
    today: NaiveDate,
) -> anyhow::Result<Vec<Member>> {
    if member.profile.is_none() || member.preferences.is_none() {
        return Ok(Vec::new());
    }

    let population = store.load_population()?;
    let current_year = today.year();

    Ok(population
        .into_iter()
        .filter(|candidate| mutually_compatible(member, candidate, current_year))
        .collect())
}

/// The compatibility predicate. A candidate qualifies only if gender and
/// age constraints hold in both directions, the candidate is in the
/// member's region allow-list (when one is set) and is not blocked.
pub fn mutually_compatible(member: &Member, candidate: &Member, current_year: i32) -> bool {
    let (Some(profile), Some(prefs)) = (&member.profile, &member.preferences) else {
        return false;
    };
    let (Some(c_profile), Some(c_prefs)) = (&candidate.profile, &candidate.preferences) else {
        return false;
    };

    if candidate.user.id == member.user.id || candidate.user.banned {
        return false;
    }

    if c_profile.gender != prefs.target_gender || c_prefs.target_gender != profile.gender {
        return false;
    }

    let member_age = current_year - profile.birth_year;
    let candidate_age = current_year - c_profile.birth_year;
    if candidate_age < prefs.age_min || candidate_age > prefs.age_max {
        return false;
    }
    if member_age < c_prefs.age_min || member_age > c_prefs.age_max {
        return false;
    }

    if !prefs.regions.is_empty() {
        match &c_profile.region {
            Some(region) if prefs.regions.contains(region) => {}
            _ => return false,
        }
    }

    !prefs.blocks.contains(&candidate.user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recs::store::testing::{member, MemStore};
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn store_with(members: Vec<Member>) -> MemStore {
        MemStore::new(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()).with_members(members)
    }

    #[test]
    fn returns_mutually_compatible_candidates() {
        let seeker = member("M", 1990, "F", (25, 40));
        let candidate = member("F", 1992, "M", (30, 40));

        let store = store_with(vec![seeker.clone(), candidate.clone()]);
        let found = find_candidates(&store, &seeker, today()).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user.id, candidate.user.id);
    }

    #[test]
    fn gender_symmetry_must_hold_both_ways() {
        let seeker = member("M", 1990, "F", (25, 40));
        // Right gender, but the candidate is looking for women.
        let candidate = member("F", 1992, "F", (30, 40));

        let store = store_with(vec![candidate]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());
    }

    #[test]
    fn age_symmetry_must_hold_both_ways() {
        // Seeker is 35 in 2025; candidate only accepts up to 30.
        let seeker = member("M", 1990, "F", (25, 40));
        let candidate = member("F", 1995, "M", (25, 30));

        let store = store_with(vec![candidate]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());

        // Candidate is 45, outside the seeker's 25-40 window.
        let too_old = member("F", 1980, "M", (25, 50));
        let store = store_with(vec![too_old]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());
    }

    #[test]
    fn banned_and_self_are_excluded() {
        let seeker = member("M", 1990, "F", (25, 40));
        let mut banned = member("F", 1992, "M", (30, 40));
        banned.user.banned = true;

        let store = store_with(vec![seeker.clone(), banned]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());
    }

    #[test]
    fn blocked_candidates_never_appear() {
        let mut seeker = member("M", 1990, "F", (25, 40));
        let candidate = member("F", 1992, "M", (30, 40));
        seeker
            .preferences
            .as_mut()
            .unwrap()
            .blocks
            .push(candidate.user.id);

        let store = store_with(vec![candidate]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());
    }

    #[test]
    fn region_allow_list_filters_when_set() {
        let mut seeker = member("M", 1990, "F", (25, 40));
        seeker.preferences.as_mut().unwrap().regions = vec!["Seoul".into()];

        let mut in_region = member("F", 1992, "M", (30, 40));
        in_region.profile.as_mut().unwrap().region = Some("Seoul".into());
        let mut out_of_region = member("F", 1993, "M", (30, 40));
        out_of_region.profile.as_mut().unwrap().region = Some("Busan".into());
        // No region at all fails a non-empty allow-list too.
        let no_region = member("F", 1994, "M", (30, 40));

        let store = store_with(vec![in_region.clone(), out_of_region, no_region]);
        let found = find_candidates(&store, &seeker, today()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user.id, in_region.user.id);
    }

    #[test]
    fn missing_profile_or_preferences_yields_no_candidates() {
        let mut seeker = member("M", 1990, "F", (25, 40));
        seeker.profile = None;
        let candidate = member("F", 1992, "M", (30, 40));

        let store = store_with(vec![candidate]);
        assert!(find_candidates(&store, &seeker, today()).unwrap().is_empty());
    }
}

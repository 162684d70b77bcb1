use super::store::Member;

/// Compatibility score for a (member, candidate) pair.
///
/// Additive point system: an age-proximity band (birth years within 2, 5
/// or 10), a shared region bonus, completeness bonuses for the candidate's
/// intro and photos, and a flat base point for any scored pair. Returns
/// 0.0 when either side lacks a profile. Pure and deterministic, no upper
/// bound.
pub fn match_score(member: &Member, candidate: &Member) -> f64 {
    let (Some(profile), Some(c_profile)) = (&member.profile, &candidate.profile) else {
        return 0.0;
    };

    let mut score = 0.0;

    let age_diff = (profile.birth_year - c_profile.birth_year).abs();
    if age_diff <= 2 {
        score += 3.0;
    } else if age_diff <= 5 {
        score += 2.0;
    } else if age_diff <= 10 {
        score += 1.0;
    }

    if let (Some(region), Some(c_region)) = (&profile.region, &c_profile.region) {
        if !region.is_empty() && region == c_region {
            score += 2.0;
        }
    }

    if c_profile
        .intro
        .as_deref()
        .map(|intro| intro.chars().count() > 20)
        .unwrap_or(false)
    {
        score += 1.0;
    }
    if c_profile.photo_count() >= 2 {
        score += 1.0;
    }

    score + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recs::store::testing::member;

    #[test]
    fn full_marks_pair_scores_eight() {
        // Born 1990 / 1992, both in Seoul, long intro, three photos.
        let mut seeker = member("M", 1990, "F", (25, 35));
        seeker.profile.as_mut().unwrap().region = Some("Seoul".into());

        let mut candidate = member("F", 1992, "M", (25, 40));
        {
            let profile = candidate.profile.as_mut().unwrap();
            profile.region = Some("Seoul".into());
            profile.intro = Some("I enjoy hiking and quiet weekend cafes.".into());
            profile.photos = serde_json::json!(["a.jpg", "b.jpg", "c.jpg"]);
        }

        assert_eq!(match_score(&seeker, &candidate), 8.0);
    }

    #[test]
    fn bare_distant_pair_scores_base_only() {
        let mut seeker = member("M", 1990, "F", (25, 55));
        seeker.profile.as_mut().unwrap().region = Some("Seoul".into());

        let mut candidate = member("F", 1975, "M", (25, 55));
        candidate.profile.as_mut().unwrap().region = Some("Busan".into());

        // age_diff 15, region mismatch, no intro, no photos
        assert_eq!(match_score(&seeker, &candidate), 1.0);
    }

    #[test]
    fn age_bands_are_mutually_exclusive() {
        let seeker = member("M", 1990, "F", (20, 60));

        let band = |birth_year: i32| match_score(&seeker, &member("F", birth_year, "M", (20, 60)));
        assert_eq!(band(1992), 4.0); // diff 2  -> +3
        assert_eq!(band(1985), 3.0); // diff 5  -> +2
        assert_eq!(band(1981), 2.0); // diff 9  -> +1
        assert_eq!(band(1979), 1.0); // diff 11 -> +0
    }

    #[test]
    fn intro_bonus_needs_more_than_twenty_chars() {
        let seeker = member("M", 1990, "F", (20, 60));

        let mut short = member("F", 1975, "M", (20, 60));
        short.profile.as_mut().unwrap().intro = Some("short intro".into());
        assert_eq!(match_score(&seeker, &short), 1.0);

        // Character count, not byte count: 21 Hangul characters.
        let mut hangul = member("F", 1975, "M", (20, 60));
        hangul.profile.as_mut().unwrap().intro = Some("가".repeat(21));
        assert_eq!(match_score(&seeker, &hangul), 2.0);
    }

    #[test]
    fn dominating_candidate_scores_strictly_higher() {
        let mut seeker = member("M", 1990, "F", (20, 60));
        seeker.profile.as_mut().unwrap().region = Some("Seoul".into());

        let mut better = member("F", 1991, "M", (20, 60));
        {
            let profile = better.profile.as_mut().unwrap();
            profile.region = Some("Seoul".into());
            profile.intro = Some("Looking for someone to travel with often.".into());
            profile.photos = serde_json::json!(["a.jpg", "b.jpg"]);
        }

        let mut worse = member("F", 1984, "M", (20, 60));
        worse.profile.as_mut().unwrap().region = Some("Busan".into());

        assert!(match_score(&seeker, &better) > match_score(&seeker, &worse));
    }

    #[test]
    fn missing_profile_scores_zero() {
        let seeker = member("M", 1990, "F", (20, 60));
        let mut incomplete = member("F", 1990, "M", (20, 60));
        incomplete.profile = None;

        assert_eq!(match_score(&seeker, &incomplete), 0.0);
        let mut seeker_incomplete = seeker.clone();
        seeker_incomplete.profile = None;
        let candidate = member("F", 1990, "M", (20, 60));
        assert_eq!(match_score(&seeker_incomplete, &candidate), 0.0);
    }
}

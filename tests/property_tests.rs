//! # Property-Based Tests
//!
//! Calendar laws, schedule monotonicity and ranking invariants.

use chrono::{Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use proptest::collection::vec;
use proptest::prelude::*;

use prodtrack::domain::{
    assess, rank, sort_by_urgency, BusinessCalendar, Priority, Project, ProjectId, ProjectType,
    RankedProject, Stage,
};

fn weekday(index: u8) -> Weekday {
    const DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    DAYS[usize::from(index % 7)]
}

/// Any date between 2000 and roughly 2054
fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..20_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + Days::new(offset)
    })
}

fn project_type_strategy() -> impl Strategy<Value = ProjectType> {
    prop_oneof![
        Just(ProjectType::A),
        Just(ProjectType::B),
        Just(ProjectType::C),
        Just(ProjectType::Mto),
        Just(ProjectType::Gtia),
    ]
}

fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        Just(Stage::Pending),
        Just(Stage::Design),
        Just(Stage::Procurement),
        Just(Stage::Production),
        Just(Stage::Installation),
    ]
}

/// A project with arbitrary urgency inputs
fn project_strategy() -> impl Strategy<Value = Project> {
    (
        project_type_strategy(),
        stage_strategy(),
        1i64..=5,
        any::<bool>(),
        0u64..60,
        proptest::option::of(0u64..120),
    )
        .prop_map(|(project_type, stage, priority, paused, entry_offset, deadline_offset)| {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
            let mut project = Project::new(ProjectId::new("prop", now), "prop", now)
                .with_project_type(project_type)
                .with_entry_date(base + Days::new(entry_offset))
                .with_priority(Priority::new(priority).unwrap());
            project.global_deadline = deadline_offset.map(|d| base + Days::new(d));
            project.current_stage = stage;
            project.paused = paused;
            project
        })
}

// =============================================================================
// CALENDAR
// =============================================================================

proptest! {
    /// Adding zero business days is the identity, even on a rest day.
    #[test]
    fn add_zero_is_identity(d in date_strategy(), rest in 0u8..7) {
        let cal = BusinessCalendar::new(weekday(rest));
        prop_assert_eq!(cal.add_business_days(d, 0), d);
    }

    /// Adding at least one business day never lands on the rest day.
    #[test]
    fn add_never_lands_on_rest_day(d in date_strategy(), n in 1u32..400, rest in 0u8..7) {
        let cal = BusinessCalendar::new(weekday(rest));
        let end = cal.add_business_days(d, n);
        prop_assert_ne!(end.weekday(), cal.rest_day());
    }

    /// Counting back the days just added gives the same number.
    #[test]
    fn between_inverts_add(d in date_strategy(), n in 0u32..400, rest in 0u8..7) {
        let cal = BusinessCalendar::new(weekday(rest));
        let end = cal.add_business_days(d, n);
        prop_assert_eq!(cal.business_days_between(d, end), i64::from(n));
        prop_assert_eq!(cal.business_days_between(end, d), -i64::from(n));
    }

    /// Subtracting from a business day mirrors adding.
    #[test]
    fn subtract_inverts_add(d in date_strategy(), n in 0u32..400) {
        let cal = BusinessCalendar::default();
        prop_assume!(cal.is_business_day(d));
        let end = cal.add_business_days(d, n);
        prop_assert_eq!(cal.subtract_business_days(end, n), d);
    }

    /// The counted range is additive over any midpoint.
    #[test]
    fn between_is_additive(a in date_strategy(), b in date_strategy(), c in date_strategy()) {
        let cal = BusinessCalendar::default();
        prop_assert_eq!(
            cal.business_days_between(a, c),
            cal.business_days_between(a, b) + cal.business_days_between(b, c)
        );
    }
}

// =============================================================================
// SCHEDULE
// =============================================================================

proptest! {
    /// Baseline remaining days drop by exactly one per business day.
    #[test]
    fn baseline_remaining_decreases(offset in 0u64..90) {
        let cal = BusinessCalendar::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let project = Project::new(ProjectId::new("mono", now), "mono", now)
            .with_project_type(ProjectType::A)
            .with_entry_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset);
        let next = cal.add_business_days(today, 1);
        let before = assess(&project, &cal, today);
        let after = assess(&project, &cal, next);

        for stage in Stage::SCHEDULED {
            prop_assert_eq!(
                after.days_remaining_for(stage).unwrap(),
                before.days_remaining_for(stage).unwrap() - 1
            );
        }
    }
}

// =============================================================================
// RANKING
// =============================================================================

proptest! {
    /// A paused project never sorts before one that is running.
    #[test]
    fn paused_never_before_running(projects in vec(project_strategy(), 0..20), day in 0u64..90) {
        let cal = BusinessCalendar::default();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(day);
        let ranked = rank(&projects, &cal, today);

        let first_paused = ranked.iter().position(|r| r.project.paused).unwrap_or(ranked.len());
        prop_assert!(ranked[first_paused..].iter().all(|r| r.project.paused));
    }

    /// Sorting keeps every element, leaves the input untouched, and is idempotent.
    #[test]
    fn sort_is_a_stable_permutation(projects in vec(project_strategy(), 0..20)) {
        let cal = BusinessCalendar::default();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let input: Vec<RankedProject> = projects
            .into_iter()
            .map(|p| RankedProject::new(p, &cal, today))
            .collect();
        let snapshot = input.clone();

        let sorted = sort_by_urgency(&input);
        prop_assert_eq!(&input, &snapshot);
        prop_assert_eq!(sorted.len(), input.len());
        prop_assert_eq!(sort_by_urgency(&sorted), sorted);
    }

    /// Identical urgency inputs keep their relative order.
    #[test]
    fn identical_inputs_keep_order(project in project_strategy(), copies in 2usize..8) {
        let cal = BusinessCalendar::default();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let input: Vec<RankedProject> = (0..copies)
            .map(|i| {
                let mut p = project.clone();
                p.name = format!("copy-{}", i);
                RankedProject::new(p, &cal, today)
            })
            .collect();

        let names: Vec<String> = sort_by_urgency(&input)
            .into_iter()
            .map(|r| r.project.name)
            .collect();
        let expected: Vec<String> = (0..copies).map(|i| format!("copy-{}", i)).collect();
        prop_assert_eq!(names, expected);
    }
}

//! Urgency ranking
//!
//! Orders the working set most-urgent first. Rules are applied in turn until
//! one tells two projects apart:
//!
//! 1. paused projects go last
//! 2. warranty (GTIA) projects go first
//! 3. projects in delay go first
//! 4. among delayed projects, the one with more days late goes first
//! 5. projects past their global deadline go first
//! 6. lower priority number goes first
//! 7. fewer days remaining goes first
//!
//! Once a project is in installation, upstream lateness stops counting: it is
//! only treated as delayed, and keeps its stored priority, when its global
//! deadline is at most two business days away (or already missed).

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

use super::calendar::BusinessCalendar;
use super::project::{Priority, Project};
use super::schedule::{assess, Assessment};
use super::stage::Stage;

/// Days to the global deadline at or below which installation stops being dampened
pub const INSTALLATION_WINDOW: i64 = 2;

/// A project together with its computed schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProject {
    pub project: Project,
    pub assessment: Assessment,
}

impl RankedProject {
    /// Assesses `project` as of `today`
    pub fn new(project: Project, calendar: &BusinessCalendar, today: NaiveDate) -> Self {
        let assessment = assess(&project, calendar, today);
        Self {
            project,
            assessment,
        }
    }

    fn in_installation(&self) -> bool {
        self.project.current_stage == Stage::Installation
    }

    /// Installation projects whose delivery is imminent or missed
    fn delivery_imminent(&self) -> bool {
        self.assessment
            .days_remaining
            .is_some_and(|days| days <= INSTALLATION_WINDOW)
    }

    /// Delay flag after installation dampening
    pub fn effective_in_delay(&self) -> bool {
        let in_delay = self.assessment.in_delay();
        if self.in_installation() {
            in_delay && self.delivery_imminent()
        } else {
            in_delay
        }
    }

    /// Priority after installation dampening
    pub fn effective_priority(&self) -> Priority {
        if self.in_installation() && !self.delivery_imminent() {
            Priority::LOWEST
        } else {
            self.project.priority
        }
    }

    pub fn is_overdue(&self) -> bool {
        self.assessment.days_remaining.is_some_and(|days| days < 0)
    }

    /// Final tiebreak figure: the current stage's remaining days, else the
    /// global deadline's
    pub fn tiebreak_days(&self) -> Option<i64> {
        self.assessment
            .delay
            .map(|d| d.stage_days_remaining)
            .or(self.assessment.days_remaining)
    }
}

/// Total urgency order, most urgent first
pub fn compare(a: &RankedProject, b: &RankedProject) -> Ordering {
    // false sorts before true, so "less urgent" flags go on the left
    a.project
        .paused
        .cmp(&b.project.paused)
        .then_with(|| {
            b.project
                .is_always_urgent()
                .cmp(&a.project.is_always_urgent())
        })
        .then_with(|| b.effective_in_delay().cmp(&a.effective_in_delay()))
        .then_with(|| {
            if a.effective_in_delay() && b.effective_in_delay() {
                b.assessment.days_late().cmp(&a.assessment.days_late())
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| b.is_overdue().cmp(&a.is_overdue()))
        .then_with(|| a.effective_priority().cmp(&b.effective_priority()))
        .then_with(|| {
            let key = |r: &RankedProject| r.tiebreak_days().unwrap_or(i64::MAX);
            key(a).cmp(&key(b))
        })
}

/// Returns the entries in urgency order. Equal entries keep their input order.
pub fn sort_by_urgency(entries: &[RankedProject]) -> Vec<RankedProject> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(compare);
    sorted
}

/// Assesses and ranks a set of projects
pub fn rank(projects: &[Project], calendar: &BusinessCalendar, today: NaiveDate) -> Vec<RankedProject> {
    let mut ranked: Vec<RankedProject> = projects
        .iter()
        .cloned()
        .map(|p| RankedProject::new(p, calendar, today))
        .collect();
    ranked.sort_by(compare);
    ranked
}

/// Display signal: should this project be flagged as urgent.
///
/// `window` is the number of business days to the global deadline at or
/// below which a project counts as urgent.
pub fn is_urgent(entry: &RankedProject, window: i64) -> bool {
    if entry.project.paused {
        return false;
    }

    let window = if entry.in_installation() {
        INSTALLATION_WINDOW
    } else {
        window
    };

    entry.effective_priority() == Priority::HIGHEST
        || entry.project.is_always_urgent()
        || entry.effective_in_delay()
        || entry.assessment.days_remaining.is_some_and(|days| days <= window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::ProjectId;
    use crate::domain::stage::ProjectType;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(name: &str) -> Project {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Project::new(ProjectId::new(name, now), name, now)
            .with_project_type(ProjectType::B)
            .with_entry_date(date(2024, 1, 1))
            .with_global_deadline(date(2024, 1, 31))
    }

    fn names(ranked: &[RankedProject]) -> Vec<&str> {
        ranked.iter().map(|r| r.project.name.as_str()).collect()
    }

    fn today() -> NaiveDate {
        date(2024, 1, 2)
    }

    fn rank_all(projects: Vec<Project>) -> Vec<String> {
        let cal = BusinessCalendar::default();
        rank(&projects, &cal, today())
            .iter()
            .map(|r| r.project.name.clone())
            .collect()
    }

    #[test]
    fn paused_goes_last() {
        let mut paused = project("paused").with_priority(Priority::HIGHEST);
        paused.paused = true;
        paused.global_deadline = Some(date(2023, 12, 1));
        let calm = project("calm").with_priority(Priority::LOWEST);

        assert_eq!(rank_all(vec![paused, calm]), vec!["calm", "paused"]);
    }

    #[test]
    fn warranty_goes_first() {
        let warranty = project("warranty")
            .with_project_type(ProjectType::Gtia)
            .with_priority(Priority::LOWEST);
        let urgent = project("urgent").with_priority(Priority::HIGHEST);

        assert_eq!(rank_all(vec![urgent, warranty]), vec!["warranty", "urgent"]);
    }

    #[test]
    fn delayed_goes_before_priority() {
        let cal = BusinessCalendar::default();
        // Still in design on Jan 8: four business days past Jan 3
        let late = project("late").with_priority(Priority::LOWEST);
        let on_time = project("on_time")
            .with_priority(Priority::HIGHEST)
            .with_entry_date(date(2024, 1, 8));

        let ranked = rank(&[on_time, late], &cal, date(2024, 1, 8));
        assert_eq!(names(&ranked), vec!["late", "on_time"]);
    }

    #[test]
    fn more_days_late_goes_first() {
        let cal = BusinessCalendar::default();
        let slightly = project("slightly").with_entry_date(date(2024, 1, 4));
        let badly = project("badly");

        let ranked = rank(&[slightly, badly], &cal, date(2024, 1, 9));
        assert!(ranked.iter().all(|r| r.effective_in_delay()));
        assert_eq!(names(&ranked), vec!["badly", "slightly"]);
    }

    #[test]
    fn overdue_before_priority() {
        let mut overdue = project("overdue").with_priority(Priority::LOWEST);
        overdue.project_type = Some(ProjectType::Mto);
        overdue.global_deadline = Some(date(2023, 12, 29));
        let mut fine = project("fine").with_priority(Priority::HIGHEST);
        fine.project_type = Some(ProjectType::Mto);

        assert_eq!(rank_all(vec![fine, overdue]), vec!["overdue", "fine"]);
    }

    #[test]
    fn priority_then_remaining_days() {
        let mut a = project("p2_far").with_priority(Priority::new(2).unwrap());
        a.project_type = Some(ProjectType::Mto);
        let mut b = project("p2_near").with_priority(Priority::new(2).unwrap());
        b.project_type = Some(ProjectType::Mto);
        b.global_deadline = Some(date(2024, 1, 10));
        let mut c = project("p1").with_priority(Priority::HIGHEST);
        c.project_type = Some(ProjectType::Mto);

        assert_eq!(rank_all(vec![a, b, c]), vec!["p1", "p2_near", "p2_far"]);
    }

    #[test]
    fn installation_dampens_delay_and_priority() {
        let cal = BusinessCalendar::default();
        let mut installing = project("installing").with_priority(Priority::HIGHEST);
        installing.current_stage = Stage::Installation;
        // Installation baseline is Jan 16; on Jan 20 it is four days late
        // but the global deadline is still far away.
        let entry = RankedProject::new(installing.clone(), &cal, date(2024, 1, 20));
        assert!(entry.assessment.in_delay());
        assert!(!entry.effective_in_delay());
        assert_eq!(entry.effective_priority(), Priority::LOWEST);
        assert!(!is_urgent(&entry, 3));

        // Two days from delivery: dampening lifts
        installing.global_deadline = Some(date(2024, 1, 23));
        let entry = RankedProject::new(installing, &cal, date(2024, 1, 20));
        assert_eq!(entry.assessment.days_remaining, Some(2));
        assert!(entry.effective_in_delay());
        assert_eq!(entry.effective_priority(), Priority::HIGHEST);
        assert!(is_urgent(&entry, 3));
    }

    #[test]
    fn installation_without_deadline_is_dampened() {
        let cal = BusinessCalendar::default();
        let mut installing = project("installing").with_priority(Priority::HIGHEST);
        installing.current_stage = Stage::Installation;
        installing.global_deadline = None;
        let entry = RankedProject::new(installing, &cal, date(2024, 1, 20));
        assert!(!entry.effective_in_delay());
        assert_eq!(entry.effective_priority(), Priority::LOWEST);
    }

    #[test]
    fn equal_entries_keep_input_order() {
        let cal = BusinessCalendar::default();
        let input: Vec<RankedProject> = ["first", "second", "third"]
            .into_iter()
            .map(|name| RankedProject::new(project(name), &cal, today()))
            .collect();

        let sorted = sort_by_urgency(&input);
        assert_eq!(names(&sorted), vec!["first", "second", "third"]);
        // Input untouched
        assert_eq!(names(&input), vec!["first", "second", "third"]);
    }

    #[test]
    fn unknown_figures_sort_after_known() {
        let mut untyped = project("untyped");
        untyped.project_type = None;
        untyped.global_deadline = None;
        let typed = project("typed");

        assert_eq!(rank_all(vec![untyped, typed]), vec!["typed", "untyped"]);
    }

    #[test]
    fn urgent_signal() {
        let cal = BusinessCalendar::default();
        let calm = RankedProject::new(project("calm"), &cal, today());
        assert!(!is_urgent(&calm, 3));

        let top = RankedProject::new(project("top").with_priority(Priority::HIGHEST), &cal, today());
        assert!(is_urgent(&top, 3));

        let near = RankedProject::new(
            project("near").with_global_deadline(date(2024, 1, 5)),
            &cal,
            today(),
        );
        assert!(is_urgent(&near, 3));

        let mut paused = project("paused").with_priority(Priority::HIGHEST);
        paused.paused = true;
        assert!(!is_urgent(&RankedProject::new(paused, &cal, today()), 3));
    }
}

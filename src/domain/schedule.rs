//! Deadline and delay calculator
//!
//! Turns a project record plus a `today` reference into per-stage deadlines
//! and remaining business days. When design finished after its deadline the
//! downstream stages are laid out again from the actual design completion:
//! forward if the global deadline leaves enough room, otherwise backwards
//! from the global deadline, compressing the schedule.
//!
//! Figures that cannot be computed are `None`, never zero.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::calendar::BusinessCalendar;
use super::project::Project;
use super::stage::{AllottedDays, Stage};

/// Stages whose deadlines move when design overruns, in pipeline order
const DOWNSTREAM: [Stage; 3] = [Stage::Procurement, Stage::Production, Stage::Installation];

/// A date the calculator needed but the record does not have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    EntryDate,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateField::EntryDate => f.write_str("entry date"),
        }
    }
}

/// Whether stage figures could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "field", rename_all = "snake_case")]
pub enum ScheduleStatus {
    Computed,
    /// No allotted-day table for the project's type (or no type at all)
    UnknownProjectType,
    MissingDate(DateField),
}

/// How downstream deadlines were derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recalculation {
    /// Entry date plus cumulative allotted days
    #[default]
    Baseline,
    /// Walked forward from the late design completion
    Forward,
    /// Walked backwards from the global deadline
    Compressed,
}

impl fmt::Display for Recalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recalculation::Baseline => f.write_str("baseline"),
            Recalculation::Forward => f.write_str("forward"),
            Recalculation::Compressed => f.write_str("compressed"),
        }
    }
}

/// Deadline and remaining business days for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StageSchedule {
    /// Negative when overdue, zero when due today
    pub days_remaining: Option<i64>,
    pub deadline: Option<NaiveDate>,
}

impl StageSchedule {
    fn known(days_remaining: i64, deadline: NaiveDate) -> Self {
        Self {
            days_remaining: Some(days_remaining),
            deadline: Some(deadline),
        }
    }
}

/// Delay indicator for the stage the project is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelayStatus {
    pub stage: Stage,
    pub in_delay: bool,
    /// Business days past the stage deadline, zero when on time
    pub days_late: i64,
    pub stage_days_remaining: i64,
}

/// Calculator output for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub status: ScheduleStatus,
    /// One entry per scheduled stage
    pub stages: BTreeMap<Stage, StageSchedule>,
    pub recalculation: Recalculation,
    /// Business days design finished after its deadline, if it did
    pub design_late_by: Option<i64>,
    /// None when stage figures are unknown or the project is completed
    pub delay: Option<DelayStatus>,
    /// Business days to the global deadline
    pub days_remaining: Option<i64>,
}

impl Assessment {
    fn unavailable(status: ScheduleStatus, days_remaining: Option<i64>) -> Self {
        Self {
            status,
            stages: Stage::SCHEDULED
                .into_iter()
                .map(|stage| (stage, StageSchedule::default()))
                .collect(),
            recalculation: Recalculation::Baseline,
            design_late_by: None,
            delay: None,
            days_remaining,
        }
    }

    /// Returns true if stage figures are available
    pub fn is_computed(&self) -> bool {
        self.status == ScheduleStatus::Computed
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageSchedule> {
        self.stages.get(&stage)
    }

    pub fn days_remaining_for(&self, stage: Stage) -> Option<i64> {
        self.stage(stage).and_then(|s| s.days_remaining)
    }

    pub fn deadline_for(&self, stage: Stage) -> Option<NaiveDate> {
        self.stage(stage).and_then(|s| s.deadline)
    }

    /// Returns true if the calculator's delay indicator is set
    pub fn in_delay(&self) -> bool {
        self.delay.is_some_and(|d| d.in_delay)
    }

    pub fn days_late(&self) -> i64 {
        self.delay.map_or(0, |d| d.days_late)
    }
}

/// Computes deadlines and remaining days for `project` as of `today`
pub fn assess(project: &Project, calendar: &BusinessCalendar, today: NaiveDate) -> Assessment {
    let overall = project
        .global_deadline
        .map(|deadline| calendar.business_days_between(today, deadline));

    let Some(table) = project.project_type.and_then(|t| t.allotted_days()) else {
        return Assessment::unavailable(ScheduleStatus::UnknownProjectType, overall);
    };
    let Some(entry) = project.entry_date else {
        return Assessment::unavailable(ScheduleStatus::MissingDate(DateField::EntryDate), overall);
    };

    let mut stages = baseline(&table, calendar, entry, today);
    let mut recalculation = Recalculation::Baseline;

    let design_deadline = calendar.add_business_days(entry, table.design);
    let design_late_by = project
        .completions
        .design
        .as_ref()
        .map(|c| (c.date(), calendar.business_days_between(design_deadline, c.date())))
        .filter(|(_, late)| *late > 0);

    if let Some((design_done, _)) = design_late_by {
        let needed = table.after_design();
        let margin = project
            .global_deadline
            .map(|deadline| (deadline, calendar.business_days_between(design_done, deadline)));

        match margin {
            Some((deadline, available)) if available < i64::from(needed) => {
                compressed(&mut stages, &table, calendar, deadline, today);
                recalculation = Recalculation::Compressed;
            }
            _ => {
                forward(&mut stages, &table, calendar, design_done, today);
                recalculation = Recalculation::Forward;
            }
        }
    }

    let delay = delay_for(project.current_stage, &stages);

    Assessment {
        status: ScheduleStatus::Computed,
        stages,
        recalculation,
        design_late_by: design_late_by.map(|(_, late)| late),
        delay,
        days_remaining: overall,
    }
}

fn baseline(
    table: &AllottedDays,
    calendar: &BusinessCalendar,
    entry: NaiveDate,
    today: NaiveDate,
) -> BTreeMap<Stage, StageSchedule> {
    let elapsed = calendar.business_days_between(entry, today);

    Stage::SCHEDULED
        .into_iter()
        .filter_map(|stage| {
            let days = table.cumulative(stage)?;
            let deadline = calendar.add_business_days(entry, days);
            Some((stage, StageSchedule::known(i64::from(days) - elapsed, deadline)))
        })
        .collect()
}

fn forward(
    stages: &mut BTreeMap<Stage, StageSchedule>,
    table: &AllottedDays,
    calendar: &BusinessCalendar,
    design_done: NaiveDate,
    today: NaiveDate,
) {
    let mut cursor = design_done;
    for stage in DOWNSTREAM {
        cursor = calendar.add_business_days(cursor, table.individual(stage).unwrap_or(0));
        let remaining = calendar.business_days_between(today, cursor);
        stages.insert(stage, StageSchedule::known(remaining, cursor));
    }
}

fn compressed(
    stages: &mut BTreeMap<Stage, StageSchedule>,
    table: &AllottedDays,
    calendar: &BusinessCalendar,
    global_deadline: NaiveDate,
    today: NaiveDate,
) {
    let mut cursor = global_deadline;
    for stage in DOWNSTREAM.into_iter().rev() {
        let remaining = calendar.business_days_between(today, cursor);
        stages.insert(stage, StageSchedule::known(remaining, cursor));
        cursor = calendar.subtract_business_days(cursor, table.individual(stage).unwrap_or(0));
    }
}

fn delay_for(current: Stage, stages: &BTreeMap<Stage, StageSchedule>) -> Option<DelayStatus> {
    let stage = match current {
        Stage::Completed => return None,
        Stage::Pending => Stage::Design,
        other => other,
    };
    let remaining = stages.get(&stage)?.days_remaining?;

    Some(DelayStatus {
        stage,
        in_delay: remaining < 0,
        days_late: (-remaining).max(0),
        stage_days_remaining: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::ProjectId;
    use crate::domain::project::{Actor, StageCompletion};
    use crate::domain::stage::ProjectType;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 17, 0, 0).unwrap()
    }

    /// Type B, entered Monday Jan 1 2024
    fn type_b() -> Project {
        Project::new(ProjectId::new("Lobby", at(2024, 1, 1)), "Lobby", at(2024, 1, 1))
            .with_project_type(ProjectType::B)
            .with_entry_date(date(2024, 1, 1))
    }

    fn design_completed_on(mut project: Project, day: DateTime<Utc>) -> Project {
        project.completions.design = Some(StageCompletion::new(day, Actor::new("ana")));
        project.current_stage = Stage::Procurement;
        project
    }

    #[test]
    fn baseline_on_entry_day() {
        let cal = BusinessCalendar::default();
        let a = assess(&type_b(), &cal, date(2024, 1, 1));

        assert!(a.is_computed());
        assert_eq!(a.recalculation, Recalculation::Baseline);
        assert_eq!(a.days_remaining_for(Stage::Design), Some(2));
        assert_eq!(a.deadline_for(Stage::Design), Some(date(2024, 1, 3)));
        assert_eq!(a.days_remaining_for(Stage::Installation), Some(13));
        assert_eq!(a.deadline_for(Stage::Installation), Some(date(2024, 1, 16)));
    }

    #[test]
    fn on_time_design_keeps_baseline() {
        let cal = BusinessCalendar::default();
        let project = design_completed_on(type_b(), at(2024, 1, 3));
        let on_time = assess(&project, &cal, date(2024, 1, 1));
        let untouched = assess(&type_b(), &cal, date(2024, 1, 1));

        assert_eq!(on_time.recalculation, Recalculation::Baseline);
        assert_eq!(on_time.design_late_by, None);
        assert_eq!(on_time.stages, untouched.stages);
        assert_eq!(on_time.days_remaining_for(Stage::Installation), Some(13));
    }

    #[test]
    fn remaining_decreases_each_business_day() {
        let cal = BusinessCalendar::default();
        let project = type_b();
        let mon = assess(&project, &cal, date(2024, 1, 8));
        let tue = assess(&project, &cal, date(2024, 1, 9));
        for stage in Stage::SCHEDULED {
            assert_eq!(
                tue.days_remaining_for(stage).unwrap(),
                mon.days_remaining_for(stage).unwrap() - 1
            );
        }
    }

    #[test]
    fn late_design_with_exact_margin_walks_forward() {
        let cal = BusinessCalendar::default();
        // Design due Wed Jan 3, done Sat Jan 6: three business days late.
        // Jan 6 -> Fri Jan 19 is exactly 11 business days.
        let project = design_completed_on(type_b(), at(2024, 1, 6)).with_global_deadline(date(2024, 1, 19));
        let a = assess(&project, &cal, date(2024, 1, 6));

        assert_eq!(a.design_late_by, Some(3));
        assert_eq!(a.recalculation, Recalculation::Forward);
        assert_eq!(a.deadline_for(Stage::Procurement), Some(date(2024, 1, 10)));
        assert_eq!(a.deadline_for(Stage::Production), Some(date(2024, 1, 16)));
        assert_eq!(a.deadline_for(Stage::Installation), Some(date(2024, 1, 19)));
        assert_eq!(a.days_remaining_for(Stage::Installation), Some(11));
        assert_eq!(a.days_remaining_for(Stage::Installation), a.days_remaining);

        // Design keeps its late baseline
        assert_eq!(a.deadline_for(Stage::Design), Some(date(2024, 1, 3)));
        assert_eq!(a.days_remaining_for(Stage::Design), Some(-3));
    }

    #[test]
    fn late_design_without_global_deadline_walks_forward() {
        let cal = BusinessCalendar::default();
        let project = design_completed_on(type_b(), at(2024, 1, 6));
        let a = assess(&project, &cal, date(2024, 1, 6));

        assert_eq!(a.recalculation, Recalculation::Forward);
        assert_eq!(a.deadline_for(Stage::Installation), Some(date(2024, 1, 19)));
        assert_eq!(a.days_remaining, None);
    }

    #[test]
    fn late_design_with_short_margin_compresses() {
        let cal = BusinessCalendar::default();
        // Only 5 business days between Jan 6 and Fri Jan 12
        let project = design_completed_on(type_b(), at(2024, 1, 6)).with_global_deadline(date(2024, 1, 12));
        let a = assess(&project, &cal, date(2024, 1, 6));

        assert_eq!(a.recalculation, Recalculation::Compressed);
        assert_eq!(a.deadline_for(Stage::Installation), Some(date(2024, 1, 12)));
        assert_eq!(a.deadline_for(Stage::Production), Some(date(2024, 1, 9)));
        assert_eq!(a.deadline_for(Stage::Procurement), Some(date(2024, 1, 3)));
        assert_eq!(a.days_remaining_for(Stage::Procurement), Some(-3));
        assert_eq!(a.days_remaining_for(Stage::Production), Some(2));
        assert_eq!(a.days_remaining_for(Stage::Installation), Some(5));

        let delay = a.delay.unwrap();
        assert_eq!(delay.stage, Stage::Procurement);
        assert!(delay.in_delay);
        assert_eq!(delay.days_late, 3);
    }

    #[test]
    fn no_table_means_unknown() {
        let cal = BusinessCalendar::default();
        for project_type in [ProjectType::Mto, ProjectType::Gtia] {
            let project = type_b()
                .with_project_type(project_type)
                .with_global_deadline(date(2024, 1, 10));
            let a = assess(&project, &cal, date(2024, 1, 8));
            assert_eq!(a.status, ScheduleStatus::UnknownProjectType);
            assert!(a.stages.values().all(|s| s.days_remaining.is_none()));
            assert!(a.delay.is_none());
            // The global deadline is still meaningful
            assert_eq!(a.days_remaining, Some(2));
        }

        let mut untyped = type_b();
        untyped.project_type = None;
        assert_eq!(
            assess(&untyped, &cal, date(2024, 1, 1)).status,
            ScheduleStatus::UnknownProjectType
        );
    }

    #[test]
    fn missing_entry_date() {
        let cal = BusinessCalendar::default();
        let project = Project::new(ProjectId::new("X", at(2024, 1, 1)), "X", at(2024, 1, 1))
            .with_project_type(ProjectType::A);
        let a = assess(&project, &cal, date(2024, 1, 1));
        assert_eq!(a.status, ScheduleStatus::MissingDate(DateField::EntryDate));
        assert_eq!(a.stages.len(), Stage::SCHEDULED.len());
        assert!(!a.in_delay());
    }

    #[test]
    fn delay_tracks_current_stage() {
        let cal = BusinessCalendar::default();
        // Still in design on Thu Jan 4, one day past the Jan 3 deadline
        let a = assess(&type_b(), &cal, date(2024, 1, 4));
        let delay = a.delay.unwrap();
        assert_eq!(delay.stage, Stage::Design);
        assert!(delay.in_delay);
        assert_eq!(delay.days_late, 1);

        // Due today is not late
        let a = assess(&type_b(), &cal, date(2024, 1, 3));
        assert!(!a.in_delay());
        assert_eq!(a.days_late(), 0);
    }

    #[test]
    fn completed_project_has_no_delay() {
        let cal = BusinessCalendar::default();
        let mut project = type_b();
        project.current_stage = Stage::Completed;
        let a = assess(&project, &cal, date(2024, 3, 1));
        assert!(a.is_computed());
        assert!(a.delay.is_none());
    }

    #[test]
    fn assessment_serializes_stage_keys() {
        let cal = BusinessCalendar::default();
        let a = assess(&type_b(), &cal, date(2024, 1, 1));
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["stages"]["installation"]["days_remaining"], 13);
        assert_eq!(json["status"]["status"], "computed");
    }
}

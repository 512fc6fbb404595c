//! Board read models
//!
//! Groupings and counts over the active project set: projects by stage,
//! headline statistics, and the per-area work queues.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::calendar::BusinessCalendar;
use super::project::{Project, ProjectError};
use super::stage::{Stage, SubStage};
use super::urgency::{is_urgent, RankedProject};

/// Stored priority first, then earliest global deadline; no deadline sorts last
fn by_priority_then_deadline(a: &Project, b: &Project) -> Ordering {
    a.priority.cmp(&b.priority).then_with(|| match (a.global_deadline, b.global_deadline) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Active projects grouped by current stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageSummary {
    pub stages: BTreeMap<Stage, Vec<Project>>,
}

impl StageSummary {
    pub fn build(projects: &[Project]) -> Self {
        let mut stages: BTreeMap<Stage, Vec<Project>> = BTreeMap::new();
        for project in projects.iter().filter(|p| p.active) {
            stages
                .entry(project.current_stage)
                .or_default()
                .push(project.clone());
        }
        for group in stages.values_mut() {
            group.sort_by(by_priority_then_deadline);
        }
        Self { stages }
    }

    /// Projects in a stage, empty if none
    pub fn get(&self, stage: Stage) -> &[Project] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Headline counts for the active project set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub by_stage: BTreeMap<Stage, usize>,
    /// Started but not completed
    pub in_process: usize,
    pub paused: usize,
    /// In-flight projects flagged by [`is_urgent`]
    pub urgent: usize,
}

impl BoardStats {
    pub fn compute(
        projects: &[Project],
        calendar: &BusinessCalendar,
        today: NaiveDate,
        urgent_window_days: i64,
    ) -> Self {
        let mut stats = BoardStats::default();

        for project in projects.iter().filter(|p| p.active) {
            stats.total += 1;
            *stats.by_stage.entry(project.current_stage).or_default() += 1;

            if project.paused {
                stats.paused += 1;
            }

            let in_flight = !matches!(project.current_stage, Stage::Pending | Stage::Completed);
            if in_flight
                && is_urgent(
                    &RankedProject::new(project.clone(), calendar, today),
                    urgent_window_days,
                )
            {
                stats.urgent += 1;
            }
        }

        let count = |stage| stats.by_stage.get(&stage).copied().unwrap_or(0);
        stats.in_process = stats.total - count(Stage::Pending) - count(Stage::Completed);
        stats
    }
}

/// Team-facing work queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkArea {
    Design,
    Procurement,
    Manufacturing,
    Metalwork,
    Installation,
}

impl WorkArea {
    pub const ALL: [WorkArea; 5] = [
        WorkArea::Design,
        WorkArea::Procurement,
        WorkArea::Manufacturing,
        WorkArea::Metalwork,
        WorkArea::Installation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkArea::Design => "design",
            WorkArea::Procurement => "procurement",
            WorkArea::Manufacturing => "manufacturing",
            WorkArea::Metalwork => "metalwork",
            WorkArea::Installation => "installation",
        }
    }

    /// Returns true if the project is waiting on this area
    pub fn includes(&self, project: &Project) -> bool {
        if !project.active {
            return false;
        }

        let sub_stage_open = |sub: SubStage| {
            project.current_stage == Stage::Production
                && project.production.get(sub).is_some_and(|p| !p.done)
        };

        match self {
            WorkArea::Design => project.current_stage == Stage::Design,
            WorkArea::Procurement => project.current_stage == Stage::Procurement,
            WorkArea::Installation => project.current_stage == Stage::Installation,
            WorkArea::Manufacturing => sub_stage_open(SubStage::Manufacturing),
            WorkArea::Metalwork => sub_stage_open(SubStage::Metalwork),
        }
    }

    /// Projects waiting on this area, most pressing first
    pub fn queue(&self, projects: &[Project]) -> Vec<Project> {
        let mut queue: Vec<Project> = projects
            .iter()
            .filter(|p| self.includes(p))
            .cloned()
            .collect();
        queue.sort_by(by_priority_then_deadline);
        queue
    }
}

impl fmt::Display for WorkArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkArea {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkArea::ALL
            .into_iter()
            .find(|area| area.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProjectError::UnknownWorkArea(s.to_string()))
    }
}

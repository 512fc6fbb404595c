//! Project domain model and stage state machine
//!
//! A project moves `pending → design → procurement → production →
//! installation → completed`. Production holds two parallel sub-stages,
//! manufacturing and metalwork, either of which may not apply.
//!
//! Every operation takes `&self` and returns a [`Transition`]: the updated
//! record plus the list of fields that changed. A rejected operation leaves
//! the original untouched. The caller supplies `now` and the acting user;
//! nothing here reads the system clock.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::id::ProjectId;
use super::stage::{ProjectType, Stage, SubStage};

#[derive(Debug, Error, PartialEq)]
pub enum ProjectError {
    #[error("Invalid priority {0}: expected 1 (most urgent) to 5 (least urgent)")]
    InvalidPriority(i64),

    #[error("Unknown project type: {0}")]
    UnknownProjectType(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Unknown production sub-stage: {0}")]
    UnknownSubStage(String),

    #[error("Unknown work area: {0}")]
    UnknownWorkArea(String),

    #[error("Inconsistent project {id}: {reason}")]
    Inconsistent { id: ProjectId, reason: String },
}

/// Rejections from the stage state machine
#[derive(Debug, Error, PartialEq)]
pub enum StageError {
    #[error("Invalid transition from {stage}: {reason}")]
    InvalidTransition { stage: Stage, reason: String },

    #[error("Cannot leave production until {} is done", join_sub_stages(.pending))]
    PrerequisiteNotMet { pending: Vec<SubStage> },
}

fn join_sub_stages(subs: &[SubStage]) -> String {
    subs.iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Urgency from 1 (most urgent) to 5 (least urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(1);
    pub const LOWEST: Priority = Priority(5);

    pub fn new(value: i64) -> Result<Self, ProjectError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ProjectError::InvalidPriority(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<i64> for Priority {
    type Error = ProjectError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who performed an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When and by whom a stage was completed. Set once, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCompletion {
    pub completed_at: DateTime<Utc>,
    pub completed_by: Actor,
}

impl StageCompletion {
    pub fn new(completed_at: DateTime<Utc>, completed_by: Actor) -> Self {
        Self {
            completed_at,
            completed_by,
        }
    }

    /// Completion date in UTC
    pub fn date(&self) -> NaiveDate {
        self.completed_at.date_naive()
    }
}

/// Completion records for the stages that keep one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCompletions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<StageCompletion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement: Option<StageCompletion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation: Option<StageCompletion>,
}

impl StageCompletions {
    /// Returns the completion record for a stage
    pub fn get(&self, stage: Stage) -> Option<&StageCompletion> {
        match stage {
            Stage::Design => self.design.as_ref(),
            Stage::Procurement => self.procurement.as_ref(),
            Stage::Installation => self.installation.as_ref(),
            _ => None,
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> Option<&mut Option<StageCompletion>> {
        match stage {
            Stage::Design => Some(&mut self.design),
            Stage::Procurement => Some(&mut self.procurement),
            Stage::Installation => Some(&mut self.installation),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.design.is_none() && self.procurement.is_none() && self.installation.is_none()
    }
}

/// Progress of one production sub-stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStageProgress {
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<StageCompletion>,
}

/// The two parallel sub-stages of production.
///
/// A `None` slot means the sub-stage does not apply to the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionTrack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturing: Option<SubStageProgress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalwork: Option<SubStageProgress>,
}

impl ProductionTrack {
    /// Creates a track with the given sub-stages applicable
    pub fn new(manufacturing: bool, metalwork: bool) -> Self {
        Self {
            manufacturing: manufacturing.then(SubStageProgress::default),
            metalwork: metalwork.then(SubStageProgress::default),
        }
    }

    /// Returns the progress of a sub-stage, or None if it does not apply
    pub fn get(&self, sub: SubStage) -> Option<&SubStageProgress> {
        match sub {
            SubStage::Manufacturing => self.manufacturing.as_ref(),
            SubStage::Metalwork => self.metalwork.as_ref(),
        }
    }

    fn get_mut(&mut self, sub: SubStage) -> Option<&mut SubStageProgress> {
        match sub {
            SubStage::Manufacturing => self.manufacturing.as_mut(),
            SubStage::Metalwork => self.metalwork.as_mut(),
        }
    }

    /// Returns true if the sub-stage applies to this project
    pub fn applies(&self, sub: SubStage) -> bool {
        self.get(sub).is_some()
    }

    /// Returns true if neither sub-stage applies
    pub fn is_empty(&self) -> bool {
        self.manufacturing.is_none() && self.metalwork.is_none()
    }

    /// Applicable sub-stages that are not done yet
    pub fn pending(&self) -> Vec<SubStage> {
        SubStage::ALL
            .into_iter()
            .filter(|sub| self.get(*sub).is_some_and(|p| !p.done))
            .collect()
    }

    /// Returns true when every applicable sub-stage is done.
    /// Vacuously true when none apply.
    pub fn all_done(&self) -> bool {
        self.pending().is_empty()
    }

    fn any_done(&self) -> bool {
        SubStage::ALL
            .into_iter()
            .any(|sub| self.get(sub).is_some_and(|p| p.done))
    }
}

/// Free-text notes left when completing a stage, one per stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNotes(BTreeMap<Stage, String>);

impl StageNotes {
    pub fn get(&self, stage: Stage) -> Option<&str> {
        self.0.get(&stage).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Stage, &String)> {
        self.0.iter()
    }

    fn set(&mut self, stage: Stage, note: String) {
        self.0.insert(stage, note);
    }
}

/// A single field change produced by an operation, for the caller to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Change {
    Stage { from: Stage, to: Stage },
    StageCompletion { stage: Stage, completion: StageCompletion },
    SubStageCompletion { sub_stage: SubStage, completion: StageCompletion },
    Note { stage: Stage, note: String },
    CompletedDate { value: Option<NaiveDate> },
    Paused { reason: Option<String> },
    Resumed,
    Priority { from: Priority, to: Priority },
    Active { value: bool },
    ProjectType { value: Option<ProjectType> },
    Extensive { value: bool },
    EntryDate { value: Option<NaiveDate> },
    GlobalDeadline { value: Option<NaiveDate> },
}

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub project: Project,
    pub changes: Vec<Change>,
}

impl Transition {
    fn unchanged(project: &Project) -> Self {
        Self {
            project: project.clone(),
            changes: Vec::new(),
        }
    }

    /// Returns true if the operation changed nothing
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Fields owned by the external spreadsheet importer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedFields {
    pub project_type: Option<ProjectType>,
    pub extensive: bool,
    pub entry_date: Option<NaiveDate>,
    pub global_deadline: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
}

/// A tracked project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Selects the allotted-day table; None when the importer has not set it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,

    /// Only meaningful for MTO: use the full timeline
    #[serde(default)]
    pub extensive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_deadline: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<NaiveDate>,

    #[serde(default)]
    pub current_stage: Stage,

    #[serde(default, skip_serializing_if = "StageCompletions::is_empty")]
    pub completions: StageCompletions,

    #[serde(default)]
    pub production: ProductionTrack,

    #[serde(default, skip_serializing_if = "StageNotes::is_empty")]
    pub notes: StageNotes,

    #[serde(default)]
    pub paused: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_reason: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    /// Cleared instead of deleting the record
    #[serde(default = "default_active")]
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Project {
    /// Creates a pending project with default priority
    pub fn new(id: ProjectId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            client: None,
            description: None,
            project_type: None,
            extensive: false,
            entry_date: None,
            global_deadline: None,
            completed_date: None,
            current_stage: Stage::Pending,
            completions: StageCompletions::default(),
            production: ProductionTrack::default(),
            notes: StageNotes::default(),
            paused: false,
            paused_reason: None,
            priority: Priority::default(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_project_type(mut self, project_type: ProjectType) -> Self {
        self.project_type = Some(project_type);
        self
    }

    pub fn with_extensive(mut self, extensive: bool) -> Self {
        self.extensive = extensive;
        self
    }

    /// Sets the entry date. A pending project with a known entry starts in design.
    pub fn with_entry_date(mut self, entry_date: NaiveDate) -> Self {
        self.entry_date = Some(entry_date);
        if self.current_stage == Stage::Pending {
            self.current_stage = Stage::Design;
        }
        self
    }

    pub fn with_global_deadline(mut self, deadline: NaiveDate) -> Self {
        self.global_deadline = Some(deadline);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sub_stages(mut self, manufacturing: bool, metalwork: bool) -> Self {
        self.production = ProductionTrack::new(manufacturing, metalwork);
        self
    }

    /// Returns true once the project reached the terminal stage
    pub fn is_completed(&self) -> bool {
        self.current_stage.is_terminal()
    }

    /// Returns true if every applicable production sub-stage is done
    pub fn all_sub_stages_done(&self) -> bool {
        self.production.all_done()
    }

    /// Returns true if the project is in production with nothing left to finish there
    pub fn ready_to_leave_production(&self) -> bool {
        self.current_stage == Stage::Production && self.all_sub_stages_done()
    }

    /// Returns true if the project uses the installation → completed timeline
    pub fn uses_simplified_timeline(&self) -> bool {
        self.project_type
            .is_some_and(|t| t.uses_simplified_timeline(self.extensive))
    }

    /// Returns true for the always-urgent project type
    pub fn is_always_urgent(&self) -> bool {
        self.project_type.is_some_and(|t| t.is_always_urgent())
    }

    /// Overall progress as a percentage
    pub fn progress_percent(&self) -> u8 {
        if self.uses_simplified_timeline() {
            return if self.is_completed() { 100 } else { 50 };
        }

        let (position, nodes) = if self.production.is_empty() {
            let position = match self.current_stage {
                Stage::Pending | Stage::Design => 0,
                Stage::Procurement | Stage::Production => 1,
                Stage::Installation => 2,
                Stage::Completed => 3,
            };
            (position, 3)
        } else {
            (self.current_stage.index(), Stage::ALL.len() - 1)
        };

        ((position * 100 + nodes / 2) / nodes) as u8
    }

    /// Checks field combinations that no sequence of operations can produce
    pub fn validate(&self) -> Result<(), ProjectError> {
        let inconsistent = |reason: String| ProjectError::Inconsistent {
            id: self.id.clone(),
            reason,
        };

        if self.current_stage < Stage::Production && self.production.any_done() {
            return Err(inconsistent(format!(
                "production sub-stage done while in {}",
                self.current_stage
            )));
        }

        for sub in SubStage::ALL {
            if let Some(progress) = self.production.get(sub) {
                if progress.completion.is_some() && !progress.done {
                    return Err(inconsistent(format!("{} has a completion but is not done", sub)));
                }
            }
        }

        if self.paused_reason.is_some() && !self.paused {
            return Err(inconsistent("pause reason set on a running project".to_string()));
        }

        Ok(())
    }

    /// Completes the current stage and advances to the next one.
    ///
    /// Leaving production requires every applicable sub-stage to be done;
    /// a project without sub-stages passes straight through. Leaving
    /// installation also stamps the completion date.
    pub fn complete_current_stage(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<Transition, StageError> {
        let from = self.current_stage;
        let to = from.next().ok_or_else(|| StageError::InvalidTransition {
            stage: from,
            reason: "project is already completed".to_string(),
        })?;

        if from == Stage::Production {
            let pending = self.production.pending();
            if !pending.is_empty() {
                return Err(StageError::PrerequisiteNotMet { pending });
            }
        }

        let mut project = self.clone();
        let mut changes = Vec::new();

        if let Some(slot) = project.completions.slot_mut(from) {
            if slot.is_none() {
                let completion = StageCompletion::new(now, actor.clone());
                *slot = Some(completion.clone());
                changes.push(Change::StageCompletion {
                    stage: from,
                    completion,
                });
            }
        }

        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            project.notes.set(from, note.to_string());
            changes.push(Change::Note {
                stage: from,
                note: note.to_string(),
            });
        }

        project.current_stage = to;
        changes.push(Change::Stage { from, to });

        if to == Stage::Completed && project.completed_date.is_none() {
            let date = now.date_naive();
            project.completed_date = Some(date);
            changes.push(Change::CompletedDate { value: Some(date) });
        }

        project.updated_at = now;
        Ok(Transition { project, changes })
    }

    /// Marks one production sub-stage as done.
    ///
    /// Does not advance the stage; once [`all_sub_stages_done`](Self::all_sub_stages_done)
    /// holds the caller still has to complete production explicitly.
    /// Completing an already-done sub-stage is a no-op.
    pub fn complete_sub_stage(
        &self,
        sub: SubStage,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, StageError> {
        if self.current_stage != Stage::Production {
            return Err(StageError::InvalidTransition {
                stage: self.current_stage,
                reason: format!("{} can only be completed during production", sub),
            });
        }

        match self.production.get(sub) {
            None => {
                return Err(StageError::InvalidTransition {
                    stage: self.current_stage,
                    reason: format!("{} does not apply to this project", sub),
                })
            }
            Some(progress) if progress.done => return Ok(Transition::unchanged(self)),
            Some(_) => {}
        }

        let mut project = self.clone();
        let completion = StageCompletion::new(now, actor.clone());
        if let Some(progress) = project.production.get_mut(sub) {
            progress.done = true;
            progress.completion = Some(completion.clone());
        }
        project.updated_at = now;

        Ok(Transition {
            project,
            changes: vec![Change::SubStageCompletion {
                sub_stage: sub,
                completion,
            }],
        })
    }

    /// Pauses the project. Stage and deadlines are left as they are.
    ///
    /// Pausing an already paused project only updates the reason.
    pub fn pause(&self, reason: Option<&str>, now: DateTime<Utc>) -> Result<Transition, StageError> {
        if self.is_completed() {
            return Err(StageError::InvalidTransition {
                stage: self.current_stage,
                reason: "a completed project cannot be paused".to_string(),
            });
        }

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        if self.paused && self.paused_reason == reason {
            return Ok(Transition::unchanged(self));
        }

        let mut project = self.clone();
        project.paused = true;
        project.paused_reason = reason.clone();
        project.updated_at = now;

        Ok(Transition {
            project,
            changes: vec![Change::Paused { reason }],
        })
    }

    /// Resumes a paused project; no-op if it is running
    pub fn resume(&self, now: DateTime<Utc>) -> Transition {
        if !self.paused {
            return Transition::unchanged(self);
        }

        let mut project = self.clone();
        project.paused = false;
        project.paused_reason = None;
        project.updated_at = now;

        Transition {
            project,
            changes: vec![Change::Resumed],
        }
    }

    /// Changes the stored priority
    pub fn set_priority(&self, priority: Priority, now: DateTime<Utc>) -> Transition {
        if self.priority == priority {
            return Transition::unchanged(self);
        }

        let mut project = self.clone();
        project.priority = priority;
        project.updated_at = now;

        Transition {
            project,
            changes: vec![Change::Priority {
                from: self.priority,
                to: priority,
            }],
        }
    }

    /// Soft-deletes the project
    pub fn deactivate(&self, now: DateTime<Utc>) -> Transition {
        if !self.active {
            return Transition::unchanged(self);
        }

        let mut project = self.clone();
        project.active = false;
        project.updated_at = now;

        Transition {
            project,
            changes: vec![Change::Active { value: false }],
        }
    }

    /// Overwrites the importer-owned fields. Stage state is never touched.
    pub fn apply_import(&self, fields: &ImportedFields, now: DateTime<Utc>) -> Transition {
        let mut project = self.clone();
        let mut changes = Vec::new();

        if project.project_type != fields.project_type {
            project.project_type = fields.project_type;
            changes.push(Change::ProjectType {
                value: fields.project_type,
            });
        }
        if project.extensive != fields.extensive {
            project.extensive = fields.extensive;
            changes.push(Change::Extensive {
                value: fields.extensive,
            });
        }
        if project.entry_date != fields.entry_date {
            project.entry_date = fields.entry_date;
            changes.push(Change::EntryDate {
                value: fields.entry_date,
            });
        }
        if project.global_deadline != fields.global_deadline {
            project.global_deadline = fields.global_deadline;
            changes.push(Change::GlobalDeadline {
                value: fields.global_deadline,
            });
        }
        if project.completed_date != fields.completed_date {
            project.completed_date = fields.completed_date;
            changes.push(Change::CompletedDate {
                value: fields.completed_date,
            });
        }

        if !changes.is_empty() {
            project.updated_at = now;
        }

        Transition { project, changes }
    }

    /// The importer-owned fields as currently stored
    pub fn imported_fields(&self) -> ImportedFields {
        ImportedFields {
            project_type: self.project_type,
            extensive: self.extensive,
            entry_date: self.entry_date,
            global_deadline: self.global_deadline,
            completed_date: self.completed_date,
        }
    }
}

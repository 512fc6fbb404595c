//! Domain models for prodtrack
//!
//! Contains the stage-tracking logic without any I/O concerns. Nothing in
//! here reads the system clock: `today` and `now` are always parameters.

mod board;
mod calendar;
mod id;
mod project;
mod schedule;
mod stage;
mod urgency;

pub use board::{BoardStats, StageSummary, WorkArea};
pub use calendar::BusinessCalendar;
pub use id::{IdError, ProjectId};
pub use project::{
    Actor, Change, ImportedFields, Priority, ProductionTrack, Project, ProjectError,
    StageCompletion, StageCompletions, StageError, StageNotes, SubStageProgress, Transition,
};
pub use schedule::{
    assess, Assessment, DateField, DelayStatus, Recalculation, ScheduleStatus, StageSchedule,
};
pub use stage::{AllottedDays, ProjectType, Stage, SubStage};
pub use urgency::{
    compare, is_urgent, rank, sort_by_urgency, RankedProject, INSTALLATION_WINDOW,
};

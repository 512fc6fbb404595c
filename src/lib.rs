//! prodtrack - Stage tracking for manufacturing and installation projects
//!
//! Projects move through design, procurement, production (with parallel
//! manufacturing and metalwork) and installation. prodtrack computes
//! business-day deadlines per stage, recalculates downstream deadlines when
//! design runs late, and ranks the working set by urgency.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{
    assess, Assessment, BusinessCalendar, Project, ProjectId, ProjectType, RankedProject, Stage,
    SubStage,
};

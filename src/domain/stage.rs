//! Stage model
//!
//! The fixed production pipeline, the two parallel production sub-stages,
//! the project types and the per-type allotted-day tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::project::ProjectError;

/// Stage of the production pipeline, in pipeline order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Registered, not yet started
    #[default]
    Pending,
    Design,
    Procurement,
    /// Contains the parallel manufacturing and metalwork sub-stages
    Production,
    Installation,
    /// Terminal state
    Completed,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 6] = [
        Stage::Pending,
        Stage::Design,
        Stage::Procurement,
        Stage::Production,
        Stage::Installation,
        Stage::Completed,
    ];

    /// Stages that carry an allotted-day budget
    pub const SCHEDULED: [Stage; 4] = [
        Stage::Design,
        Stage::Procurement,
        Stage::Production,
        Stage::Installation,
    ];

    /// Returns the stage that follows this one, or None for the terminal stage
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Pending => Some(Stage::Design),
            Stage::Design => Some(Stage::Procurement),
            Stage::Procurement => Some(Stage::Production),
            Stage::Production => Some(Stage::Installation),
            Stage::Installation => Some(Stage::Completed),
            Stage::Completed => None,
        }
    }

    /// Position in the pipeline (pending = 0, completed = 5)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns true for the terminal stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Design => "design",
            Stage::Procurement => "procurement",
            Stage::Production => "production",
            Stage::Installation => "installation",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Stage::Pending),
            "design" => Ok(Stage::Design),
            "procurement" | "purchasing" => Ok(Stage::Procurement),
            "production" => Ok(Stage::Production),
            "installation" => Ok(Stage::Installation),
            "completed" | "complete" | "done" => Ok(Stage::Completed),
            _ => Err(ProjectError::UnknownStage(s.to_string())),
        }
    }
}

/// Parallel sub-stage of production
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStage {
    Manufacturing,
    Metalwork,
}

impl SubStage {
    pub const ALL: [SubStage; 2] = [SubStage::Manufacturing, SubStage::Metalwork];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubStage::Manufacturing => "manufacturing",
            SubStage::Metalwork => "metalwork",
        }
    }
}

impl fmt::Display for SubStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubStage {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manufacturing" => Ok(SubStage::Manufacturing),
            "metalwork" => Ok(SubStage::Metalwork),
            _ => Err(ProjectError::UnknownSubStage(s.to_string())),
        }
    }
}

/// Project type, as supplied by the external importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    A,
    B,
    C,
    /// Maintenance
    #[serde(rename = "MTO")]
    Mto,
    /// Warranty work, always ranked first
    #[serde(rename = "GTIA")]
    Gtia,
}

impl ProjectType {
    /// Cumulative allotted-day table, if this type has one
    pub fn allotted_days(&self) -> Option<AllottedDays> {
        match self {
            ProjectType::A => Some(AllottedDays::new(5, 10, 20, 25)),
            ProjectType::B => Some(AllottedDays::new(2, 5, 10, 13)),
            ProjectType::C => Some(AllottedDays::new(1, 2, 5, 6)),
            ProjectType::Mto | ProjectType::Gtia => None,
        }
    }

    /// Returns true if deadline and delay figures can be computed for this type
    pub fn has_allotted_days(&self) -> bool {
        self.allotted_days().is_some()
    }

    /// Returns true for the type that outranks every other in the urgency order
    pub fn is_always_urgent(&self) -> bool {
        matches!(self, ProjectType::Gtia)
    }

    /// Returns true if this type uses the two-node installation → completed timeline
    pub fn uses_simplified_timeline(&self, extensive: bool) -> bool {
        match self {
            ProjectType::Gtia => true,
            ProjectType::Mto => !extensive,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::A => "A",
            ProjectType::B => "B",
            ProjectType::C => "C",
            ProjectType::Mto => "MTO",
            ProjectType::Gtia => "GTIA",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(ProjectType::A),
            "B" => Ok(ProjectType::B),
            "C" => Ok(ProjectType::C),
            "MTO" => Ok(ProjectType::Mto),
            "GTIA" => Ok(ProjectType::Gtia),
            _ => Err(ProjectError::UnknownProjectType(s.to_string())),
        }
    }
}

/// Cumulative business days allotted to each scheduled stage, counted from entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllottedDays {
    pub design: u32,
    pub procurement: u32,
    pub production: u32,
    pub installation: u32,
}

impl AllottedDays {
    pub fn new(design: u32, procurement: u32, production: u32, installation: u32) -> Self {
        Self {
            design,
            procurement,
            production,
            installation,
        }
    }

    /// Cumulative days from entry until the stage is due
    pub fn cumulative(&self, stage: Stage) -> Option<u32> {
        match stage {
            Stage::Design => Some(self.design),
            Stage::Procurement => Some(self.procurement),
            Stage::Production => Some(self.production),
            Stage::Installation => Some(self.installation),
            Stage::Pending | Stage::Completed => None,
        }
    }

    /// Days allotted to the stage alone (its cumulative value minus the previous stage's)
    pub fn individual(&self, stage: Stage) -> Option<u32> {
        let previous = match stage {
            Stage::Design => 0,
            Stage::Procurement => self.design,
            Stage::Production => self.procurement,
            Stage::Installation => self.production,
            Stage::Pending | Stage::Completed => return None,
        };
        self.cumulative(stage).map(|days| days.saturating_sub(previous))
    }

    /// Days needed for everything after design
    pub fn after_design(&self) -> u32 {
        self.installation.saturating_sub(self.design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = Stage::Pending;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::ALL.to_vec());
        assert!(stage.is_terminal());
    }

    #[test]
    fn stage_parse_and_display() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!("Done".parse::<Stage>().unwrap(), Stage::Completed);
        assert!("shipping".parse::<Stage>().is_err());
    }

    #[test]
    fn project_type_parse_is_case_insensitive() {
        assert_eq!(" mto ".parse::<ProjectType>().unwrap(), ProjectType::Mto);
        assert_eq!("gtia".parse::<ProjectType>().unwrap(), ProjectType::Gtia);
        assert_eq!("b".parse::<ProjectType>().unwrap(), ProjectType::B);
        assert!(matches!(
            "D".parse::<ProjectType>(),
            Err(ProjectError::UnknownProjectType(_))
        ));
    }

    #[test]
    fn only_abc_have_tables() {
        assert!(ProjectType::A.has_allotted_days());
        assert!(ProjectType::B.has_allotted_days());
        assert!(ProjectType::C.has_allotted_days());
        assert!(!ProjectType::Mto.has_allotted_days());
        assert!(!ProjectType::Gtia.has_allotted_days());
    }

    #[test]
    fn individual_days_are_differences() {
        let table = ProjectType::B.allotted_days().unwrap();
        assert_eq!(table.individual(Stage::Design), Some(2));
        assert_eq!(table.individual(Stage::Procurement), Some(3));
        assert_eq!(table.individual(Stage::Production), Some(5));
        assert_eq!(table.individual(Stage::Installation), Some(3));
        assert_eq!(table.individual(Stage::Pending), None);
        assert_eq!(table.after_design(), 11);
    }

    #[test]
    fn simplified_timeline() {
        assert!(ProjectType::Gtia.uses_simplified_timeline(false));
        assert!(ProjectType::Gtia.uses_simplified_timeline(true));
        assert!(ProjectType::Mto.uses_simplified_timeline(false));
        assert!(!ProjectType::Mto.uses_simplified_timeline(true));
        assert!(!ProjectType::A.uses_simplified_timeline(false));
    }

    #[test]
    fn project_type_serializes_as_code() {
        assert_eq!(serde_json::to_string(&ProjectType::Mto).unwrap(), "\"MTO\"");
        let parsed: ProjectType = serde_json::from_str("\"GTIA\"").unwrap();
        assert_eq!(parsed, ProjectType::Gtia);
    }
}

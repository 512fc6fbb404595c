//! Project CLI commands

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Subcommand;

use super::output::{fmt_date, fmt_days, Output};
use crate::domain::{
    is_urgent, Actor, Change, Priority, Project, ProjectId, ProjectType, RankedProject,
    ScheduleStatus, Stage, SubStage, Transition,
};
use crate::storage::Workspace;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Register a project
    ///
    /// Examples:
    ///   prodtrack project add "Hotel lobby" --type B --entry 2024-01-01
    ///   prodtrack project add "Warranty visit" --type GTIA --priority 1
    Add {
        /// Project name
        name: String,

        /// Client name
        #[arg(long)]
        client: Option<String>,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,

        /// Project type (A, B, C, MTO, GTIA)
        #[arg(long = "type")]
        project_type: Option<ProjectType>,

        /// MTO project that follows the full timeline
        #[arg(long)]
        extensive: bool,

        /// Entry date (YYYY-MM-DD); a known entry starts the project in design
        #[arg(long)]
        entry: Option<NaiveDate>,

        /// Global delivery deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,

        /// Priority, 1 (most urgent) to 5
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
        priority: Option<i64>,

        /// Production includes manufacturing
        #[arg(long)]
        manufacturing: bool,

        /// Production includes metalwork
        #[arg(long)]
        metalwork: bool,
    },

    /// List projects
    List {
        /// Only projects in this stage
        #[arg(long)]
        stage: Option<Stage>,

        /// Include removed projects
        #[arg(long)]
        all: bool,
    },

    /// Show project details and schedule
    Show {
        /// Project ID
        id: ProjectId,
    },

    /// Complete the current stage and move to the next one
    Advance {
        /// Project ID
        id: ProjectId,

        /// Note kept for the stage being completed
        #[arg(long)]
        note: Option<String>,

        /// Refuse unless the project is still in this stage
        #[arg(long)]
        expect: Option<Stage>,
    },

    /// Mark a production sub-stage as done
    Sub {
        /// Project ID
        id: ProjectId,

        /// manufacturing or metalwork
        sub_stage: SubStage,
    },

    /// Pause a project
    Pause {
        /// Project ID
        id: ProjectId,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Resume a paused project
    Resume {
        /// Project ID
        id: ProjectId,
    },

    /// Change a project's priority
    Priority {
        /// Project ID
        id: ProjectId,

        /// 1 (most urgent) to 5
        #[arg(value_parser = clap::value_parser!(i64).range(1..=5))]
        value: i64,
    },

    /// Overwrite the externally managed fields, as the spreadsheet import does
    Import {
        /// Project ID
        id: ProjectId,

        #[arg(long = "type")]
        project_type: Option<ProjectType>,

        #[arg(long)]
        extensive: Option<bool>,

        #[arg(long)]
        entry: Option<NaiveDate>,

        #[arg(long)]
        deadline: Option<NaiveDate>,

        #[arg(long)]
        completed: Option<NaiveDate>,
    },

    /// Remove a project (it is kept on disk, marked inactive)
    Remove {
        /// Project ID
        id: ProjectId,
    },
}

pub fn run(
    cmd: ProjectCommands,
    output: &Output,
    actor: Option<&str>,
    today: Option<NaiveDate>,
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    output.verbose_ctx(
        "project",
        &format!("Opened workspace at: {}", workspace.root().display()),
    );

    match cmd {
        ProjectCommands::Add {
            name,
            client,
            description,
            project_type,
            extensive,
            entry,
            deadline,
            priority,
            manufacturing,
            metalwork,
        } => {
            let now = Utc::now();
            let mut project = Project::new(ProjectId::new(&name, now), name, now)
                .with_extensive(extensive)
                .with_sub_stages(manufacturing, metalwork);

            project = match priority {
                Some(value) => project.with_priority(Priority::new(value)?),
                None => project.with_priority(workspace.config().project.default_priority()),
            };
            if let Some(client) = client {
                project = project.with_client(client);
            }
            if let Some(description) = description {
                project = project.with_description(description);
            }
            if let Some(project_type) = project_type {
                project = project.with_project_type(project_type);
            }
            if let Some(entry) = entry {
                project = project.with_entry_date(entry);
            }
            if let Some(deadline) = deadline {
                project = project.with_global_deadline(deadline);
            }

            add_project(&workspace, output, project)
        }
        ProjectCommands::List { stage, all } => list_projects(&workspace, output, stage, all),
        ProjectCommands::Show { id } => show_project(&workspace, output, &id, today),
        ProjectCommands::Advance { id, note, expect } => {
            let actor = resolve_actor(&workspace, actor);
            advance_project(&workspace, output, &id, &actor, note.as_deref(), expect)
        }
        ProjectCommands::Sub { id, sub_stage } => {
            let actor = resolve_actor(&workspace, actor);
            complete_sub_stage(&workspace, output, &id, sub_stage, &actor)
        }
        ProjectCommands::Pause { id, reason } => {
            let transition = workspace.store().apply(&id, |p| {
                Ok(p.pause(reason.as_deref(), Utc::now())?)
            })?;
            report(output, &transition, &format!("Paused {}", id))
        }
        ProjectCommands::Resume { id } => {
            let transition = workspace.store().apply(&id, |p| Ok(p.resume(Utc::now())))?;
            report(output, &transition, &format!("Resumed {}", id))
        }
        ProjectCommands::Priority { id, value } => {
            let priority = Priority::new(value)?;
            let transition = workspace
                .store()
                .apply(&id, |p| Ok(p.set_priority(priority, Utc::now())))?;
            report(output, &transition, &format!("Set priority of {} to {}", id, priority))
        }
        ProjectCommands::Import {
            id,
            project_type,
            extensive,
            entry,
            deadline,
            completed,
        } => {
            let transition = workspace.store().apply(&id, |p| {
                let mut fields = p.imported_fields();
                if project_type.is_some() {
                    fields.project_type = project_type;
                }
                if let Some(extensive) = extensive {
                    fields.extensive = extensive;
                }
                if entry.is_some() {
                    fields.entry_date = entry;
                }
                if deadline.is_some() {
                    fields.global_deadline = deadline;
                }
                if completed.is_some() {
                    fields.completed_date = completed;
                }
                Ok(p.apply_import(&fields, Utc::now()))
            })?;
            report(output, &transition, &format!("Imported fields for {}", id))
        }
        ProjectCommands::Remove { id } => {
            let transition = workspace.store().apply(&id, |p| Ok(p.deactivate(Utc::now())))?;
            report(output, &transition, &format!("Removed {}", id))
        }
    }
}

fn resolve_actor(workspace: &Workspace, flag: Option<&str>) -> Actor {
    flag.map(Actor::new)
        .unwrap_or_else(|| workspace.config().project.actor())
}

fn add_project(workspace: &Workspace, output: &Output, project: Project) -> Result<()> {
    let store = workspace.store();

    if store.read_all()?.contains_key(&project.id) {
        anyhow::bail!("Project {} already exists", project.id);
    }
    store.append(&project)?;
    output.verbose_ctx("add", &format!("Appended {} to {}", project.id, store.path().display()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": project.id.to_string(),
            "name": project.name,
            "stage": project.current_stage,
            "priority": project.priority,
        }));
    } else {
        output.success(&format!(
            "Created project: {} - {} ({})",
            project.id, project.name, project.current_stage
        ));
    }

    Ok(())
}

fn list_projects(
    workspace: &Workspace,
    output: &Output,
    stage: Option<Stage>,
    include_removed: bool,
) -> Result<()> {
    let projects: Vec<Project> = workspace
        .store()
        .read_all()?
        .into_values()
        .filter(|p| include_removed || p.active)
        .filter(|p| stage.map_or(true, |s| p.current_stage == s))
        .collect();

    if output.is_json() {
        let items: Vec<_> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id.to_string(),
                    "name": p.name,
                    "client": p.client,
                    "type": p.project_type,
                    "stage": p.current_stage,
                    "priority": p.priority,
                    "paused": p.paused,
                    "active": p.active,
                    "progress": p.progress_percent(),
                })
            })
            .collect();
        output.data(&items);
    } else if projects.is_empty() {
        println!("No projects");
    } else {
        println!("{:<10} {:<13} {:<4} {:<5} {:>4}  NAME", "ID", "STAGE", "PRI", "TYPE", "%");
        println!("{}", "-".repeat(70));
        for p in &projects {
            let mut name = p.name.clone();
            if p.paused {
                name.push_str(" [paused]");
            }
            if !p.active {
                name.push_str(" [removed]");
            }
            println!(
                "{:<10} {:<13} {:<4} {:<5} {:>4}  {}",
                p.id,
                p.current_stage,
                p.priority,
                p.project_type.map(|t| t.as_str()).unwrap_or("-"),
                p.progress_percent(),
                name
            );
        }
    }

    Ok(())
}

fn show_project(
    workspace: &Workspace,
    output: &Output,
    id: &ProjectId,
    today: Option<NaiveDate>,
) -> Result<()> {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let calendar = workspace.config().project.calendar();
    let entry = RankedProject::new(workspace.store().get(id)?, &calendar, today);
    let urgent = is_urgent(&entry, workspace.config().project.urgent_window_days);
    let (project, assessment) = (&entry.project, &entry.assessment);
    output.verbose_ctx(
        "show",
        &format!("Assessed {} as of {}: {:?}", id, today, assessment.status),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "project": project,
            "progress": project.progress_percent(),
            "ready_to_leave_production": project.ready_to_leave_production(),
            "schedule": assessment,
            "urgent": urgent,
            "today": today,
        }));
        return Ok(());
    }

    println!("Project: {}", project.id);
    println!("Name: {}", project.name);
    if let Some(client) = &project.client {
        println!("Client: {}", client);
    }
    println!(
        "Type: {}{}",
        project.project_type.map(|t| t.as_str()).unwrap_or("-"),
        if project.extensive { " (extensive)" } else { "" }
    );
    println!("Stage: {} ({}%)", project.current_stage, project.progress_percent());
    println!("Priority: {}", project.priority);
    println!("Entry: {}", fmt_date(project.entry_date));
    println!("Deadline: {}", fmt_date(project.global_deadline));
    if project.completed_date.is_some() {
        println!("Completed: {}", fmt_date(project.completed_date));
    }
    if project.paused {
        println!(
            "Paused: {}",
            project.paused_reason.as_deref().unwrap_or("(no reason given)")
        );
    }
    if !project.active {
        println!("Removed: yes");
    }
    if let Some(description) = &project.description {
        println!("\nDescription:");
        println!("{}", description);
    }

    if !project.production.is_empty() {
        println!("\nProduction:");
        for sub in SubStage::ALL {
            if let Some(progress) = project.production.get(sub) {
                let state = match &progress.completion {
                    Some(c) => format!(
                        "done {} by {}",
                        c.completed_at.format("%Y-%m-%d %H:%M"),
                        c.completed_by
                    ),
                    None if progress.done => "done".to_string(),
                    None => "open".to_string(),
                };
                println!("  {:<14} {}", sub, state);
            }
        }
        if project.ready_to_leave_production() {
            println!("  ready to advance to installation");
        }
    }

    println!("\nSchedule as of {}:", today);
    if !assessment.is_computed() {
        match assessment.status {
            ScheduleStatus::MissingDate(field) => {
                println!("  unknown: {} not set", field)
            }
            _ => println!("  unknown: no allotted-day table for this type"),
        }
    }
    println!("  {:<14} {:<12} {:>6}  DONE", "STAGE", "DEADLINE", "DAYS");
    for stage in Stage::SCHEDULED {
        let schedule = assessment.stage(stage).copied().unwrap_or_default();
        let done = project
            .completions
            .get(stage)
            .map(|c| format!("{} by {}", c.completed_at.format("%Y-%m-%d"), c.completed_by))
            .unwrap_or_default();
        println!(
            "  {:<14} {:<12} {:>6}  {}",
            stage,
            fmt_date(schedule.deadline),
            fmt_days(schedule.days_remaining),
            done
        );
    }
    if let Some(late) = assessment.design_late_by {
        println!(
            "  design finished {} business day(s) late; downstream schedule: {}",
            late, assessment.recalculation
        );
    }
    if let Some(delay) = assessment.delay.filter(|d| d.in_delay) {
        println!("  {} is {} business day(s) late", delay.stage, delay.days_late);
    }
    println!("  Days to deadline: {}", fmt_days(assessment.days_remaining));
    if urgent {
        println!("  URGENT");
    }

    if !project.notes.is_empty() {
        println!("\nNotes:");
        for (stage, note) in project.notes.iter() {
            println!("  {}: {}", stage, note);
        }
    }

    Ok(())
}

fn advance_project(
    workspace: &Workspace,
    output: &Output,
    id: &ProjectId,
    actor: &Actor,
    note: Option<&str>,
    expect: Option<Stage>,
) -> Result<()> {
    let transition = workspace.store().apply(id, |current| {
        // Re-checked against the record read under this call, right before applying
        if let Some(expected) = expect {
            if current.current_stage != expected {
                anyhow::bail!(
                    "Project {} is in {}, expected {}",
                    current.id,
                    current.current_stage,
                    expected
                );
            }
        }
        current
            .complete_current_stage(actor, Utc::now(), note)
            .with_context(|| format!("Cannot advance {}", current.id))
    })?;

    let stage = transition.project.current_stage;
    output.verbose_ctx("advance", &format!("{} change(s) recorded", transition.changes.len()));
    report(output, &transition, &format!("Advanced {} to {}", id, stage))?;

    if stage == Stage::Production && !transition.project.production.is_empty() {
        let pending: Vec<&str> = transition
            .project
            .production
            .pending()
            .iter()
            .map(|s| s.as_str())
            .collect();
        output.hint(&format!(
            "complete {} with `prodtrack project sub {} <sub-stage>`",
            pending.join(" and "),
            id
        ));
    }

    Ok(())
}

fn complete_sub_stage(
    workspace: &Workspace,
    output: &Output,
    id: &ProjectId,
    sub: SubStage,
    actor: &Actor,
) -> Result<()> {
    let transition = workspace.store().apply(id, |current| {
        current
            .complete_sub_stage(sub, actor, Utc::now())
            .with_context(|| format!("Cannot complete {} for {}", sub, current.id))
    })?;

    let message = if transition.is_noop() {
        format!("{} was already done for {}", sub, id)
    } else {
        format!("Completed {} for {}", sub, id)
    };
    report(output, &transition, &message)?;

    if transition.project.ready_to_leave_production() {
        output.hint(&format!(
            "all production sub-stages done; run `prodtrack project advance {}`",
            id
        ));
    }

    Ok(())
}

/// Prints the outcome of a state change
fn report(output: &Output, transition: &Transition, message: &str) -> Result<()> {
    if output.is_json() {
        output.data(&serde_json::json!({
            "id": transition.project.id.to_string(),
            "stage": transition.project.current_stage,
            "changes": transition.changes,
        }));
    } else if transition.is_noop() {
        output.success(&format!("{} (no change)", message));
    } else {
        output.success(message);
        for change in &transition.changes {
            output.verbose_ctx("change", &describe(change));
        }
    }

    Ok(())
}

fn describe(change: &Change) -> String {
    match change {
        Change::Stage { from, to } => format!("stage {} -> {}", from, to),
        Change::StageCompletion { stage, completion } => {
            format!("{} completed by {}", stage, completion.completed_by)
        }
        Change::SubStageCompletion {
            sub_stage,
            completion,
        } => format!("{} completed by {}", sub_stage, completion.completed_by),
        Change::Note { stage, .. } => format!("note recorded for {}", stage),
        Change::CompletedDate { value } => format!("completed date = {}", fmt_date(*value)),
        Change::Paused { reason } => {
            format!("paused ({})", reason.as_deref().unwrap_or("no reason"))
        }
        Change::Resumed => "resumed".to_string(),
        Change::Priority { from, to } => format!("priority {} -> {}", from, to),
        Change::Active { value } => format!("active = {}", value),
        Change::ProjectType { value } => format!(
            "type = {}",
            value.map(|t| t.as_str()).unwrap_or("-")
        ),
        Change::Extensive { value } => format!("extensive = {}", value),
        Change::EntryDate { value } => format!("entry date = {}", fmt_date(*value)),
        Change::GlobalDeadline { value } => format!("global deadline = {}", fmt_date(*value)),
    }
}

//! Board commands (board, area, status)
//!
//! Read-only views over the active project set.

use anyhow::Result;
use chrono::NaiveDate;

use super::output::{fmt_date, fmt_days, Output};
use crate::domain::{is_urgent, rank, BoardStats, RankedProject, Stage, WorkArea};
use crate::storage::Workspace;

/// Show in-flight projects, most urgent first
pub fn board(output: &Output, today: NaiveDate) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let config = &workspace.config().project;
    let calendar = config.calendar();

    let projects: Vec<_> = workspace
        .store()
        .read_active()?
        .into_iter()
        .filter(|p| !p.is_completed())
        .collect();
    output.verbose_ctx(
        "board",
        &format!("Ranking {} project(s) as of {}", projects.len(), today),
    );

    let ranked = rank(&projects, &calendar, today);
    let window = config.urgent_window_days;

    if output.is_json() {
        let items: Vec<_> = ranked
            .iter()
            .map(|r| board_entry_json(r, window))
            .collect();
        output.data(&items);
    } else if ranked.is_empty() {
        println!("No projects in progress");
    } else {
        println!(
            "{:<4} {:<10} {:<13} {:<4} {:<5} {:>6} {:>6}  NAME",
            "#", "ID", "STAGE", "PRI", "TYPE", "STAGE", "TOTAL"
        );
        println!("{}", "-".repeat(80));
        for (position, r) in ranked.iter().enumerate() {
            let p = &r.project;
            let mut flags = Vec::new();
            if is_urgent(r, window) {
                flags.push("urgent".to_string());
            }
            if r.effective_in_delay() {
                flags.push(format!("late {}d", r.assessment.days_late()));
            }
            if p.paused {
                flags.push("paused".to_string());
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            println!(
                "{:<4} {:<10} {:<13} {:<4} {:<5} {:>6} {:>6}  {}{}",
                position + 1,
                p.id,
                p.current_stage,
                p.priority,
                p.project_type.map(|t| t.as_str()).unwrap_or("-"),
                fmt_days(r.assessment.delay.map(|d| d.stage_days_remaining)),
                fmt_days(r.assessment.days_remaining),
                p.name,
                flags
            );
        }
    }

    Ok(())
}

fn board_entry_json(r: &RankedProject, window: i64) -> serde_json::Value {
    serde_json::json!({
        "id": r.project.id.to_string(),
        "name": r.project.name,
        "type": r.project.project_type,
        "stage": r.project.current_stage,
        "priority": r.project.priority,
        "effective_priority": r.effective_priority(),
        "paused": r.project.paused,
        "in_delay": r.effective_in_delay(),
        "days_late": r.assessment.days_late(),
        "stage_days_remaining": r.assessment.delay.map(|d| d.stage_days_remaining),
        "days_remaining": r.assessment.days_remaining,
        "global_deadline": r.project.global_deadline,
        "urgent": is_urgent(r, window),
    })
}

/// Show the work queue for one area
pub fn area(output: &Output, area: WorkArea, today: NaiveDate) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let calendar = workspace.config().project.calendar();
    let queue = area.queue(&workspace.store().read_all()?.into_values().collect::<Vec<_>>());
    output.verbose_ctx("area", &format!("{} project(s) waiting on {}", queue.len(), area));

    if output.is_json() {
        let items: Vec<_> = queue
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id.to_string(),
                    "name": p.name,
                    "stage": p.current_stage,
                    "priority": p.priority,
                    "paused": p.paused,
                    "global_deadline": p.global_deadline,
                    "days_remaining": p
                        .global_deadline
                        .map(|d| calendar.business_days_between(today, d)),
                })
            })
            .collect();
        output.data(&items);
    } else if queue.is_empty() {
        println!("Nothing waiting on {}", area);
    } else {
        println!("{} queue ({}):", area, queue.len());
        println!("{:<10} {:<4} {:<12} {:>6}  NAME", "ID", "PRI", "DEADLINE", "DAYS");
        println!("{}", "-".repeat(60));
        for p in &queue {
            let days = p
                .global_deadline
                .map(|d| calendar.business_days_between(today, d));
            println!(
                "{:<10} {:<4} {:<12} {:>6}  {}{}",
                p.id,
                p.priority,
                fmt_date(p.global_deadline),
                fmt_days(days),
                p.name,
                if p.paused { " [paused]" } else { "" }
            );
        }
    }

    Ok(())
}

/// Show headline counts
pub fn status(output: &Output, today: NaiveDate) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let config = &workspace.config().project;
    let projects: Vec<_> = workspace.store().read_all()?.into_values().collect();

    let stats = BoardStats::compute(
        &projects,
        &config.calendar(),
        today,
        config.urgent_window_days,
    );

    if output.is_json() {
        output.data(&stats);
        return Ok(());
    }

    println!("Production Status ({})", today);
    println!("{}", "=".repeat(40));
    println!();
    println!("Projects: {} total", stats.total);
    for stage in Stage::ALL {
        println!(
            "  {:<14} {}",
            format!("{}:", stage),
            stats.by_stage.get(&stage).copied().unwrap_or(0)
        );
    }
    println!();
    println!("  In process:    {}", stats.in_process);
    println!("  Paused:        {}", stats.paused);
    println!("  Urgent:        {}", stats.urgent);

    Ok(())
}

// Colored terminal output for lead lists, drafts and cycle summaries.
//
// This module handles all terminal-specific formatting. The main.rs command
// handlers delegate here.

use colored::Colorize;

use crate::db::models::Lead;
use crate::notify::QueueStats;
use crate::pipeline::{CycleReport, PlatformOutcome};

/// Characters of lead content shown in the lead list.
pub const LIST_PREVIEW_CHARS: usize = 150;

/// Display the most recent leads, newest first.
pub fn display_leads(leads: &[Lead]) {
    if leads.is_empty() {
        println!("No leads yet. Run `leadwatch once` to search every platform.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Recent Leads ({}) ===", leads.len()).bold()
    );

    for lead in leads {
        println!();
        println!(
            "  {} {} {}",
            format!("[{}]", lead.platform).cyan(),
            lead.title.bold(),
            status_tags(lead),
        );
        println!("    {}", lead.link.underline());
        if !lead.content.is_empty() {
            println!(
                "    {}",
                super::truncate_chars(&lead.content, LIST_PREVIEW_CHARS).dimmed()
            );
        }
        println!(
            "    {} {}",
            "found".dimmed(),
            lead.created_at.format("%Y-%m-%d %H:%M UTC").to_string().dimmed()
        );
    }
    println!();
}

fn status_tags(lead: &Lead) -> String {
    let mut tags = Vec::new();
    if lead.draft_generated {
        tags.push("drafted".green().to_string());
    }
    if lead.applied {
        tags.push("applied".magenta().to_string());
    }
    tags.join(" ")
}

/// Display a rendered draft for one lead.
pub fn display_draft(lead: &Lead, draft: &str) {
    println!(
        "\n{}",
        format!("=== Draft for {} lead {} ===", lead.platform, lead.external_id).bold()
    );
    println!("  {}", lead.link.underline());
    println!();
    for line in draft.lines() {
        println!("  {line}");
    }
    println!();
}

/// Display one cycle's per-platform outcome.
pub fn display_cycle_report(report: &CycleReport) {
    let elapsed = report.finished_at - report.started_at;
    println!(
        "\n{}",
        format!("=== Cycle finished in {}s ===", elapsed.num_seconds()).bold()
    );

    for outcome in &report.outcomes {
        let counts = outcome.report();
        let line = format!(
            "{:<10} {:>3} new  {:>3} duplicate  {:>3} malformed",
            outcome.platform().as_str(),
            counts.new_leads,
            counts.duplicates,
            counts.malformed,
        );
        match outcome {
            PlatformOutcome::Completed { .. } => println!("  {} {}", "ok".green(), line),
            PlatformOutcome::Failed { reason, .. } => {
                println!("  {} {}", "!!".red().bold(), line);
                println!("       {}", reason.red());
            }
        }
    }

    let totals = report.totals();
    if totals.drafted > 0 {
        println!("  {} drafts generated", totals.drafted);
    }
    if totals.applied > 0 {
        println!("  {} leads auto-applied", totals.applied);
    }
}

/// Display notification delivery counts after the queue has drained.
pub fn display_queue_stats(stats: &QueueStats) {
    let failed = if stats.failed > 0 {
        stats.failed.to_string().red().to_string()
    } else {
        stats.failed.to_string()
    };
    println!(
        "  Alerts: {} delivered, {} failed, {} dropped",
        stats.delivered, failed, stats.dropped
    );
}

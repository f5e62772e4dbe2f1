// System status display — DB size, lead counts, last cycle.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::LeadStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn LeadStore>, db_display_path: &str) -> Result<()> {
    // Database file size
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    let stats = store.lead_stats().await?;
    if stats.total == 0 {
        println!("Leads: none yet");
        println!("  Run `leadwatch once` to search every platform");
    } else {
        println!(
            "Leads: {} total, {} drafted, {} applied",
            stats.total, stats.drafted, stats.applied
        );
        for count in &stats.by_platform {
            println!("  {:<10} {}", count.platform, count.total);
        }
    }

    match store.get_scan_state("last_cycle_at").await? {
        Some(last_cycle) => {
            println!("Last cycle: {}", last_cycle);
            if let Some(summary) = store.get_scan_state("last_cycle_summary").await? {
                println!("  {}", summary);
            }
        }
        None => {
            println!("Last cycle: never");
        }
    }

    Ok(())
}

/// Human-readable file size.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Whether a database file exists at `db_path` yet.
pub fn is_initialized(db_path: &str) -> bool {
    Path::new(db_path).exists()
}

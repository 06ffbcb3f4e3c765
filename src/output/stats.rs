//! Statistics display
//!
//! Renders a site report as plain text for the terminal.

use crate::output::SiteReport;

/// Formats the statistics of a site
///
/// # Arguments
///
/// * `report` - The site report to display
///
/// # Returns
///
/// A multi-line, human-readable block
pub fn format_statistics(report: &SiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ({}) ===\n\n", report.label, report.site));

    out.push_str("Overview:\n");
    out.push_str(&format!("  Pages cached: {}\n", report.stats.total_pages));
    out.push_str(&format!("  E-invoicing pages: {}\n", report.stats.match_pages));
    let match_rate = if report.stats.total_pages > 0 {
        report.stats.match_pages as f64 / report.stats.total_pages as f64 * 100.0
    } else {
        0.0
    };
    out.push_str(&format!("  Match rate: {:.2}%\n", match_rate));
    match report.stats.last_run_at {
        Some(at) => out.push_str(&format!("  Last run: {}\n", at.to_rfc3339())),
        None => out.push_str("  Last run: never\n"),
    }
    out.push('\n');

    if !report.recent_runs.is_empty() {
        out.push_str("Recent Runs:\n");
        for run in &report.recent_runs {
            let summary = &run.summary;
            let minutes = (summary.completed_at - summary.started_at).num_seconds() as f64 / 60.0;
            out.push_str(&format!(
                "  #{} {} {} at {}: {} pages, {} new matches ({:.1} min)\n",
                run.id,
                summary.mode,
                summary.status,
                summary.started_at.to_rfc3339(),
                summary.total_pages_crawled,
                summary.new_match_count,
                minutes
            ));
        }
        out.push('\n');
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(report: &SiteReport) {
    print!("{}", format_statistics(report));
}

//! Markdown export of stored matches
//!
//! This module generates a human-readable markdown document listing every
//! stored e-invoicing page, grouped by site.

use crate::output::{OutputResult, SiteReport};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown export of `reports` to `output_path`
///
/// # Arguments
///
/// * `reports` - One report per exported site
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the export
/// * `Err(OutputError)` - Failed to write the file
pub fn generate_markdown_summary(reports: &[SiteReport], output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(reports, Utc::now());

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats site reports as markdown
pub fn format_markdown_summary(reports: &[SiteReport], generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str("# E-Invoicing Pages\n\n");
    md.push_str(&format!("_Generated {}_\n\n", generated_at.to_rfc3339()));

    for report in reports {
        md.push_str(&format!("## {}\n\n", report.label));
        md.push_str(&format!("- **Pages cached**: {}\n", report.stats.total_pages));
        md.push_str(&format!("- **E-invoicing pages**: {}\n", report.stats.match_pages));
        if let Some(last_run) = report.stats.last_run_at {
            md.push_str(&format!("- **Last run**: {}\n", last_run.to_rfc3339()));
        }
        md.push('\n');

        if report.matches.is_empty() {
            md.push_str("_No e-invoicing pages found yet._\n\n");
            continue;
        }

        for (index, page) in report.matches.iter().enumerate() {
            md.push_str(&format!("{}. [{}]({})\n", index + 1, page.title, page.url));
            if let Some(keyword) = &page.matched_keyword {
                md.push_str(&format!("   - Keyword: `{}`\n", keyword));
            }
            md.push_str(&format!(
                "   - Found: {}\n",
                page.scraped_at.format("%Y-%m-%d")
            ));
            if let Some(summary) = &page.summary {
                md.push_str(&format!("   - {}\n", summary));
            }
        }
        md.push('\n');
    }

    md
}

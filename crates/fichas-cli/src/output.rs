//! Output formatting module

use fichas_app::app::BatchReport;
use fichas_app::export::PreviewTable;
use fichas_domain::model::Record;
use fichas_types::{OutputFormat, Result};
use serde_json::json;
use std::path::Path;

pub fn output_records(output_format: OutputFormat, records: &[Record]) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        print_preview_table(&PreviewTable::from_records(records));
    }
    Ok(())
}

pub fn output_generated(
    output_format: OutputFormat,
    records: &[Record],
    report: &BatchReport,
    archive_path: &Path,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = json!({
            "archive": archive_path.display().to_string(),
            "documents": report.documents,
            "entries": report.entries,
            "collisions": report.collisions,
            "records": records,
        });
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        print_preview_table(&PreviewTable::from_records(records));
        println!();
        println!("{} fichas geradas", report.documents);
        println!("Archive: {}", archive_path.display());
        if !report.collisions.is_empty() {
            println!("Replaced by a later record: {}", report.collisions.join(", "));
        }
    }
    Ok(())
}

pub fn print_preview_table(table: &PreviewTable) {
    if table.is_empty() {
        println!("No records found.");
        return;
    }

    let widths = table.column_widths();
    println!("{}", format_row(&table.headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));
    for row in &table.rows {
        println!("{}", format_row(row, &widths));
    }
    println!("\nTotal: {} records", table.len());
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row_pads_by_chars() {
        let widths = vec![5, 3];
        let row = vec!["José".to_string(), "ab".to_string()];
        assert_eq!(format_row(&row, &widths), "José  | ab ");
    }
}

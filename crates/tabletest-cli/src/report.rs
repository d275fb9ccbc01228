// Human-readable output
use std::fmt::Write;

use tabletest_core::converter::AnalysisReport;
use tabletest_core::BatchResult;

/// Summary printed after a conversion run
pub fn render_summary(result: &BatchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Conversion complete:");
    let _ = writeln!(out, "  Files processed: {}", result.files_processed);
    let _ = writeln!(out, "  Files modified: {}", result.files_modified);
    let _ = writeln!(out, "  Tables converted: {}", result.tables_converted);

    if !result.errors.is_empty() {
        let _ = writeln!(out, "Errors:");
        for error in &result.errors {
            let _ = writeln!(out, "  - {error}");
        }
    }
    out
}

pub fn render_analysis(report: &AnalysisReport) -> String {
    let mut out = String::new();
    for (i, file) in report.files.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{file}");
    }

    let tables: usize = report.files.iter().map(|file| file.eligible_tables()).sum();
    let _ = writeln!(
        out,
        "\nAnalyzed {} files: {} convertible tables",
        report.files.len(),
        tables
    );

    if !report.errors.is_empty() {
        let _ = writeln!(out, "Errors:");
        for error in &report.errors {
            let _ = writeln!(out, "  - {error}");
        }
    }
    out
}

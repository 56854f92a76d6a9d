//! Error display with source context

use autograde_api::ErrorReport;

/// Print a report and, when it has a position, the lines around it
pub fn print_report_with_source(report: &ErrorReport, source: &str) {
    eprintln!("{report}");
    if let Some(line) = report.line {
        print_source_context(source, line, report.column);
    }
}

/// Print the lines around `error_line`, marking `error_col` if known
pub fn print_source_context(source: &str, error_line: usize, error_col: Option<usize>) {
    const CONTEXT_LINES: usize = 3;

    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return;
    }
    let start = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end.to_string().len();

    eprintln!("{}|--", "-".repeat(width + 1));
    for line_no in start..=end {
        eprintln!("{line_no:>width$} | {}", lines[line_no - 1]);
        if line_no == error_line {
            if let Some(col) = error_col {
                eprintln!("{} | {}^", " ".repeat(width), " ".repeat(col.saturating_sub(1)));
            }
        }
    }
    eprintln!("{}|--", "-".repeat(width + 1));
}

//! Terminal rendering of reports

mod cli;

pub use cli::{print_report_with_source, print_source_context};

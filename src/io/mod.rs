//! Input/output: local dataset files, the table export, the chart bundle and
//! the report files

mod bundle;
mod csv;
mod report;

pub use self::csv::{read_annotations, read_expression_matrix, write_table, write_table_to};
pub use bundle::{bundle_charts, write_bundle};
pub use report::{
    collect_notes, render_text, summarize_report, write_metadata, write_outputs, GroupSummary,
    ReportNote, ReportSummary, TestSummary, CHARTS_FILE, METADATA_FILE, SUMMARY_FILE, TABLE_FILE,
};

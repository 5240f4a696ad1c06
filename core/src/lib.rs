pub mod extract;
pub mod record;
pub mod report;

pub use extract::{clean, extract_file, extract_report, ExtractError};
pub use record::{FindingRecord, ScanField, CSV_COLUMNS};
pub use report::{
    discover, output_file_name, run_timestamp, write_report, ReportError, REPORT_EXTENSION,
};

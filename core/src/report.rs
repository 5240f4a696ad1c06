use crate::record::{FindingRecord, CSV_COLUMNS};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

pub const REPORT_EXTENSION: &str = ".nessus";

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]-[hour][minute][second]");

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot find specified directory \"{0}\"")]
    DirectoryNotFound(PathBuf),
    #[error("could not list directory \"{path}\": {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no .nessus files found in \"{0}\"")]
    NoInputFiles(PathBuf),
    #[error("could not create output file \"{path}\": {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("error writing CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not flush output file: {0}")]
    Flush(#[from] std::io::Error),
    #[error("failed to write {failed} of {total} rows")]
    RowsFailed { failed: usize, total: usize },
}

/// Lists the `.nessus` entries directly inside `directory`, sorted by name so
/// repeated runs visit files in the same order.
pub fn discover(directory: &Path) -> Result<Vec<PathBuf>, ReportError> {
    if !directory.is_dir() {
        return Err(ReportError::DirectoryNotFound(directory.to_path_buf()));
    }

    let entries = fs::read_dir(directory).map_err(|source| ReportError::List {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::List {
            path: directory.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(REPORT_EXTENSION));
        if matches {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ReportError::NoInputFiles(directory.to_path_buf()));
    }
    Ok(files)
}

/// Timestamp taken once at program start; local time when the offset can be
/// determined, UTC otherwise.
pub fn run_timestamp() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Output name scheme: `{directoryName}_{YYYYMMDD-HHMMSS}.csv`, placed in the
/// current working directory by the caller.
pub fn output_file_name(directory: &Path, timestamp: OffsetDateTime) -> String {
    let name = directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| directory.to_string_lossy().into_owned());
    let stamp = timestamp
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| "00000000-000000".to_string());
    format!("{name}_{stamp}.csv")
}

/// Writes the accumulated rows as CSV. The fixed header goes out first even
/// when there are no rows. Row failures do not stop the remaining rows; they
/// are counted and surfaced as one aggregated error.
pub fn write_report(rows: &[FindingRecord], output_path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)
        .map_err(|source| ReportError::Create {
            path: output_path.to_path_buf(),
            source,
        })?;

    writer.write_record(CSV_COLUMNS)?;

    let mut failed = 0usize;
    for row in rows {
        if let Err(err) = writer.serialize(row) {
            eprintln!("[warn] failed to write row: {err}");
            failed += 1;
        }
    }
    writer.flush()?;

    if failed > 0 {
        return Err(ReportError::RowsFailed {
            failed,
            total: rows.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nessus2csv-{label}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("scratch dir should be creatable");
        dir
    }

    #[test]
    fn discover_rejects_a_missing_directory() {
        let err = discover(Path::new("/nonexistent/scan-drop")).expect_err("must fail");
        assert!(matches!(err, ReportError::DirectoryNotFound(_)));
    }

    #[test]
    fn discover_requires_at_least_one_matching_file() {
        let dir = scratch_dir("no-match");
        fs::write(dir.join("notes.txt"), "not a report").expect("fixture write");

        let err = discover(&dir).expect_err("must fail");
        assert!(matches!(err, ReportError::NoInputFiles(_)));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn discover_lists_matching_files_in_sorted_order() {
        let dir = scratch_dir("sorted");
        fs::write(dir.join("b.nessus"), "<x/>").expect("fixture write");
        fs::write(dir.join("a.nessus"), "<x/>").expect("fixture write");
        fs::write(dir.join("skip.xml"), "<x/>").expect("fixture write");

        let files = discover(&dir).expect("discovery succeeds");
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.nessus", "b.nessus"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn output_name_combines_directory_and_timestamp() {
        let stamp = datetime!(2024-01-02 03:04:05 UTC);
        assert_eq!(
            output_file_name(Path::new("scans"), stamp),
            "scans_20240102-030405.csv"
        );
        assert_eq!(
            output_file_name(Path::new("/srv/audit/q1/"), stamp),
            "q1_20240102-030405.csv"
        );
    }

    #[test]
    fn header_is_written_even_without_rows() {
        let dir = scratch_dir("empty-report");
        let output = dir.join("out.csv");
        write_report(&[], &output).expect("write succeeds");

        let contents = fs::read_to_string(&output).expect("output readable");
        assert_eq!(
            contents.trim_end(),
            "Severity,CVSS Score,IP Address,FQDN,Port,OS,Vulnerability,CVE"
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rows_are_written_in_order_with_quoting() {
        let dir = scratch_dir("rows");
        let output = dir.join("out.csv");

        let mut first = FindingRecord::default();
        first.severity = "High".to_string();
        first.cvss_score = "7.5".to_string();
        first.ip_address = "10.0.0.5".to_string();
        first.fqdn = "host.local".to_string();
        first.port = "443".to_string();
        first.vulnerability = "X".to_string();
        first.cve = "CVE-2020-1".to_string();

        let mut second = FindingRecord::default();
        second.severity = "Low".to_string();
        second.cvss_score = "2.6".to_string();
        second.vulnerability = "TLS, weak ciphers".to_string();

        write_report(&[first, second], &output).expect("write succeeds");

        let contents = fs::read_to_string(&output).expect("output readable");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "High,7.5,10.0.0.5,host.local,443,,X,CVE-2020-1");
        assert_eq!(lines[2], "Low,2.6,,,,,\"TLS, weak ciphers\",");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn repeated_writes_produce_identical_content() {
        let dir = scratch_dir("idempotent");
        let mut row = FindingRecord::default();
        row.severity = "Medium".to_string();
        row.cvss_score = "5.0".to_string();
        row.ip_address = "192.0.2.1".to_string();

        let first_path = dir.join("first.csv");
        let second_path = dir.join("second.csv");
        write_report(std::slice::from_ref(&row), &first_path).expect("write succeeds");
        write_report(std::slice::from_ref(&row), &second_path).expect("write succeeds");

        let first = fs::read_to_string(&first_path).expect("output readable");
        let second = fs::read_to_string(&second_path).expect("output readable");
        assert_eq!(first, second);

        let _ = fs::remove_dir_all(&dir);
    }
}

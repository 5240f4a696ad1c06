use clap::Parser;
use nessus2csv_core::{
    discover, extract_file, output_file_name, run_timestamp, write_report, FindingRecord,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Merge all .nessus files within a folder into one .csv report"
)]
struct Nessus2CsvCli {
    /// Folder containing .nessus files
    directory: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Nessus2CsvCli::parse();
    let timestamp = run_timestamp();

    let files = discover(&cli.directory)?;
    println!("[*] found {} .nessus file(s)", files.len());

    let mut rows: Vec<FindingRecord> = Vec::new();
    for file in &files {
        match extract_file(file) {
            Ok(findings) => rows.extend(findings),
            // A file deleted between discovery and read only costs its own
            // rows; anything else aborts the run.
            Err(err) if err.is_missing_file() => eprintln!("[warn] {err}"),
            Err(err) => return Err(err.into()),
        }
    }

    let output = PathBuf::from(output_file_name(&cli.directory, timestamp));
    write_report(&rows, &output)?;
    println!("[*] wrote {} row(s) to {}", rows.len(), output.display());

    Ok(())
}

//! CSV export of student records.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::StudentRecord;

pub const CSV_HEADER: &str = "RegistrationNo,Name,Email,Contact,DOB,Hostelite";

/// Render records as CSV text: the fixed header, then one line per record in
/// the order given. Missing values become empty cells. A cell is quoted only
/// when it holds a comma, a quote or a line break, so ordinary data is written
/// verbatim.
pub fn render_csv(records: &[StudentRecord]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        let cells = record.display_values();
        for (idx, cell) in cells.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            push_cell(&mut out, cell);
        }
        out.push('\n');
    }
    out
}

/// Write `records` to `destination` as UTF-8 CSV, adding a `.csv` extension
/// when the path has none. Returns the path actually written.
pub fn write_csv(records: &[StudentRecord], destination: &Path) -> Result<PathBuf> {
    let path = with_csv_extension(destination);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(&path, render_csv(records))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), records = records.len(), "exported records");
    Ok(path)
}

fn with_csv_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("csv")
    }
}

fn push_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(cell);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Hostelite;

    fn record(key: &str, name: &str, dob: Option<NaiveDate>) -> StudentRecord {
        StudentRecord {
            registration_no: key.into(),
            name: name.into(),
            email: Some(format!("{key}@uobs.edu")),
            contact: None,
            date_of_birth: dob,
            hostelite: Some(Hostelite::Yes),
        }
    }

    #[test]
    fn two_records_give_header_plus_two_lines() {
        let records = vec![
            record("S2", "Bilal", NaiveDate::from_ymd_opt(2001, 2, 3)),
            record("S1", "Amna", None),
        ];
        let text = render_csv(&records);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                CSV_HEADER,
                "S2,Bilal,S2@uobs.edu,,2001-02-03,Yes",
                "S1,Amna,S1@uobs.edu,,,Yes",
            ]
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(render_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn special_characters_are_quoted() {
        let text = render_csv(&[record("S1", "Khan, \"Ali\"", None)]);
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "S1,\"Khan, \"\"Ali\"\"\",S1@uobs.edu,,,Yes"
        );
    }

    #[test]
    fn extension_is_added_only_when_missing() {
        assert_eq!(with_csv_extension(Path::new("out")), PathBuf::from("out.csv"));
        assert_eq!(with_csv_extension(Path::new("out.txt")), PathBuf::from("out.txt"));
    }
}
